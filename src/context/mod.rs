//! Resolution of a component's declared context against a backend.
//!
//! Components declare context entries in their spec:
//!
//! ```json
//! "context": {
//!     "currency": "SEK",
//!     "webshop": { "type": "prerequisite" },
//!     "article": {
//!         "type": "jsonrpc",
//!         "method": "Article.get",
//!         "params": ["{{articleUid}}", true]
//!     }
//! }
//! ```
//!
//! Literals pass through, `prerequisite` entries echo the caller-supplied value, and
//! `jsonrpc` entries call the backend after `{{var}}` placeholders in string
//! parameters are filled from the caller context.

use anyhow::Result;
use futures::future::BoxFuture;
use regex::Regex;
use reqwest::Client;
use serde_json::{Map, Value, json};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::assets::http::build_client;
use crate::component::Component;
use crate::core::DiversityError;

/// Resolves a component's declared context for one render.
pub trait ContextResolver: Send + Sync {
    /// Resolve every entry of `component.context()`.
    ///
    /// `caller` is the render context exactly as supplied by the caller.
    fn resolve_context<'a>(
        &'a self,
        backend_url: Option<&'a str>,
        component: &'a Component,
        caller: &'a Map<String, Value>,
    ) -> BoxFuture<'a, Result<Map<String, Value>>>;
}

/// [`ContextResolver`] speaking JSON-RPC 2.0 over HTTP.
#[derive(Debug)]
pub struct JsonRpcContextResolver {
    client: Client,
    next_id: AtomicU64,
}

impl JsonRpcContextResolver {
    /// Create a resolver with its own HTTP client.
    #[must_use]
    pub fn new() -> Self {
        Self::with_client(build_client())
    }

    /// Create a resolver sharing an HTTP client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self {
            client,
            next_id: AtomicU64::new(1),
        }
    }

    async fn call(
        &self,
        component: &Component,
        backend_url: Option<&str>,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value> {
        let failed = |reason: String| DiversityError::ContextResolutionFailed {
            component: component.identity(),
            reason,
        };

        let url = backend_url.ok_or_else(|| failed("no backend URL in render context".to_string()))?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        debug!("JSON-RPC {} -> {}", method, url);
        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| failed(format!("{method}: {e}")))?;

        if !response.status().is_success() {
            return Err(failed(format!("{method}: HTTP {}", response.status())).into());
        }

        let mut body: Value =
            response.json().await.map_err(|e| failed(format!("{method}: invalid response: {e}")))?;

        if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
            return Err(failed(format!("{method}: {error}")).into());
        }

        Ok(body.get_mut("result").map(Value::take).unwrap_or(Value::Null))
    }
}

impl Default for JsonRpcContextResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextResolver for JsonRpcContextResolver {
    fn resolve_context<'a>(
        &'a self,
        backend_url: Option<&'a str>,
        component: &'a Component,
        caller: &'a Map<String, Value>,
    ) -> BoxFuture<'a, Result<Map<String, Value>>> {
        Box::pin(async move {
            let mut resolved = Map::new();

            for (key, declared) in component.context() {
                let Some(entry) = declared.as_object() else {
                    resolved.insert(key.clone(), declared.clone());
                    continue;
                };

                let Some(kind) = entry.get("type").and_then(Value::as_str) else {
                    warn!("{} has context with no type: {}", component, key);
                    resolved.insert(key.clone(), declared.clone());
                    continue;
                };

                let value = match kind {
                    "prerequisite" => caller.get(key).cloned().ok_or_else(|| {
                        DiversityError::MissingPrerequisite {
                            component: component.identity(),
                            key: key.clone(),
                        }
                    })?,
                    "jsonrpc" => {
                        let method = entry.get("method").and_then(Value::as_str).unwrap_or_default();
                        let params = substitute_params(component, entry.get("params"), caller)?;
                        self.call(component, backend_url, method, params).await?
                    }
                    other => {
                        return Err(DiversityError::UnhandledContextType {
                            component: component.identity(),
                            key: key.clone(),
                            kind: other.to_string(),
                        }
                        .into());
                    }
                };
                resolved.insert(key.clone(), value);
            }

            Ok(resolved)
        })
    }
}

/// `{{ name }}` in a JSON-RPC parameter.
static PLACEHOLDER: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^}]+?)\s*\}\}"));

/// Fill `{{var}}` placeholders in string parameters from the caller context.
///
/// # Errors
///
/// [`DiversityError::UnknownContextVariable`] when a placeholder has no value.
pub fn substitute_params(
    component: &Component,
    params: Option<&Value>,
    caller: &Map<String, Value>,
) -> Result<Vec<Value>> {
    let params = match params {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(single) => vec![single.clone()],
    };

    let placeholder = PLACEHOLDER.as_ref().map_err(Clone::clone)?;

    params
        .into_iter()
        .map(|param| -> Result<Value> {
            let Value::String(text) = &param else {
                return Ok(param);
            };

            let mut out = String::with_capacity(text.len());
            let mut last = 0;
            for caps in placeholder.captures_iter(text) {
                let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                let value = caller.get(name.as_str()).ok_or_else(|| {
                    DiversityError::UnknownContextVariable {
                        component: component.identity(),
                        variable: name.as_str().to_string(),
                    }
                })?;
                out.push_str(&text[last..whole.start()]);
                match value {
                    Value::String(s) => out.push_str(s),
                    other => out.push_str(&other.to_string()),
                }
                last = whole.end();
            }
            out.push_str(&text[last..]);
            Ok(Value::String(out))
        })
        .collect()
}
