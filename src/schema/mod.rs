//! JSON Schema validation.
//!
//! The engine only needs "give me the list of problems", so validation sits behind
//! the small [`SchemaValidator`] trait. [`JsonSchemaValidator`] implements it with the
//! `jsonschema` crate; tests and embedders may swap in their own.

use serde_json::Value;

/// Validates a JSON instance against a JSON Schema.
pub trait SchemaValidator: Send + Sync {
    /// Return human-readable validation errors; an empty list means valid.
    fn validate(&self, schema: &Value, instance: &Value) -> Vec<String>;
}

/// [`SchemaValidator`] backed by the `jsonschema` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSchemaValidator;

impl JsonSchemaValidator {
    /// Create a validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, schema: &Value, instance: &Value) -> Vec<String> {
        collect_errors(schema, instance)
    }
}

/// Validate `instance` against `schema` and format each error as `<path>: <message>`.
///
/// A schema that does not compile yields a single error describing why.
pub fn collect_errors(schema: &Value, instance: &Value) -> Vec<String> {
    let validator = match jsonschema::validator_for(schema) {
        Ok(validator) => validator,
        Err(e) => return vec![format!("invalid schema: {e}")],
    };

    validator
        .iter_errors(instance)
        .map(|e| {
            let path = e.instance_path.to_string();
            let path = if path.is_empty() {
                "/".to_string()
            } else {
                path
            };
            format!("{path}: {e}")
        })
        .collect()
}
