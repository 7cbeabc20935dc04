//! Custom Tera filters available to component templates.

use std::collections::HashMap;

use crate::constants::{DEFAULT_CURRENCY, DEFAULT_LANGUAGE};

fn text_input<'a>(name: &str, value: &'a tera::Value) -> tera::Result<&'a str> {
    value.as_str().ok_or_else(|| tera::Error::msg(format!("{name} filter requires a string")))
}

/// `currency`: replace the word `currency` with the configured currency code.
pub fn currency(value: &tera::Value, _args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
    let text = text_input("currency", value)?;
    Ok(tera::Value::String(text.replace("currency", DEFAULT_CURRENCY)))
}

/// `gettext`: return the text unchanged.
pub fn gettext(value: &tera::Value, _args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
    Ok(value.clone())
}

/// Build the `lang` filter for one render, bound to `language`.
pub fn create_lang_filter(language: Option<String>) -> impl tera::Filter + 'static {
    let language = language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
    move |value: &tera::Value, _args: &HashMap<String, tera::Value>| -> tera::Result<tera::Value> {
        let text = text_input("lang", value)?;
        Ok(tera::Value::String(text.replace("lang", &language)))
    }
}
