//! The master schema every `diversity.json` is checked against.

use serde_json::{Value, json};
use std::sync::OnceLock;

/// Return the master component schema.
pub fn master_schema() -> &'static Value {
    static SCHEMA: OnceLock<Value> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        let path_list = json!({
            "oneOf": [
                { "type": "string" },
                { "type": "array", "items": { "type": "string" } }
            ]
        });

        json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "title": "Diversity component",
            "type": "object",
            "required": ["name", "version"],
            "properties": {
                "name": { "type": "string", "pattern": "^[A-Za-z0-9_.-]+$" },
                "version": {
                    "type": "string",
                    "pattern": "^v?[0-9]+(\\.[0-9]+){0,2}([-+].+)?$"
                },
                "title": { "type": "string" },
                "description": { "type": "string" },
                "type": { "type": "string" },
                "pagetype": { "type": "string" },
                "thumbnail": { "type": "string" },
                "template": path_list,
                "style": path_list,
                "script": path_list,
                "themes": path_list,
                "assets": path_list,
                "dependencies": {
                    "type": "object",
                    "additionalProperties": { "type": "string" }
                },
                "settings": { "type": ["object", "string"] },
                "context": { "type": "object" },
                "fields": { "type": "object" },
                "partials": { "type": "object" },
                "angular": { "type": ["boolean", "string"] },
                "i18n": {
                    "type": "object",
                    "additionalProperties": {
                        "oneOf": [
                            { "type": "string" },
                            {
                                "type": "object",
                                "properties": { "view": { "type": "string" } },
                                "required": ["view"]
                            }
                        ]
                    }
                }
            }
        })
    })
}
