//! Tera-backed [`TemplateRenderer`].

use anyhow::Result;
use serde_json::{Map, Value};
use tera::{Context as TeraContext, Tera};

use super::{TemplateRenderer, filters};

/// Renders component templates with Tera.
///
/// A fresh `Tera` instance is created per render so that the `lang` filter can be
/// bound to the render's language without shared state.
#[derive(Debug, Default, Clone, Copy)]
pub struct TeraRenderer;

impl TeraRenderer {
    /// Create a renderer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Flatten a Tera error chain into one readable message, hiding Tera's internal
    /// one-off template name.
    pub fn format_tera_error(error: &tera::Error) -> String {
        use std::error::Error;

        let mut messages = Vec::new();
        let mut current: Option<&dyn Error> = Some(error);
        while let Some(err) = current {
            let cleaned = err
                .to_string()
                .replace("Failed to render '__tera_one_off'", "")
                .replace("Failed to parse '__tera_one_off'", "Template syntax error")
                .replace("'__tera_one_off'", "template")
                .trim()
                .to_string();
            if !cleaned.is_empty() {
                messages.push(cleaned);
            }
            current = err.source();
        }

        if messages.is_empty() {
            "Template syntax error".to_string()
        } else {
            messages.join(": ")
        }
    }
}

impl TemplateRenderer for TeraRenderer {
    fn render(&self, template: &str, namespace: &Map<String, Value>) -> Result<String> {
        let context = TeraContext::from_value(Value::Object(namespace.clone()))
            .map_err(|e| anyhow::anyhow!(Self::format_tera_error(&e)))?;

        let language = namespace.get("lang").and_then(Value::as_str).map(str::to_string);

        let mut tera = Tera::default();
        tera.register_filter("currency", filters::currency);
        tera.register_filter("gettext", filters::gettext);
        tera.register_filter("lang", filters::create_lang_filter(language));

        tera.render_str(template, &context).map_err(|e| anyhow::anyhow!(Self::format_tera_error(&e)))
    }
}
