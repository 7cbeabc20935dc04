//! Registry backed by a Diversity API server.
//!
//! Endpoints used, relative to the API root:
//!
//! - `GET /` answers with the welcome sentinel (liveness probe)
//! - `GET components/` lists components as `[{"name": ...}, ...]`
//! - `GET components/<name>` lists version strings
//! - `GET components/<name>/<version>/files/diversity.json` serves a spec, with its
//!   assets next to it under `files/`
//!
//! Every response is cached by URL, so a URL fetched within the TTL is never fetched
//! again.

use anyhow::Result;
use futures::future::BoxFuture;
use reqwest::Client;
use semver::Version;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{Listing, Registry, parent_url, unavailable};
use crate::assets::http::{build_client, fetch_text};
use crate::cache::Cache;
use crate::component::{Component, ComponentOptions};
use crate::constants::{API_WELCOME_SENTINEL, DEFAULT_CACHE_MAX_ENTRIES, SPEC_FILE_NAME, default_remote_ttl};
use crate::version::{VersionRequirement, parse_version};

/// Options for [`RemoteApiRegistry`].
#[derive(Debug, Clone)]
pub struct RemoteRegistryOptions {
    /// API root
    pub url: String,
    /// Validate specs against the master schema
    pub validate: bool,
    /// How long responses are cached
    pub ttl: Duration,
    /// Bound for the response cache
    pub cache_max_entries: usize,
}

impl RemoteRegistryOptions {
    /// Defaults for the API at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            validate: false,
            ttl: default_remote_ttl(),
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }

    /// Enable or disable spec validation.
    #[must_use]
    pub const fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Set the response TTL.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Registry talking to a Diversity API server.
pub struct RemoteApiRegistry {
    name: String,
    /// API root, always ending with `/`
    url: String,
    validate: bool,
    ttl: Duration,
    responses: Cache<Option<Arc<Value>>>,
    components: Cache<Arc<Component>>,
    client: Client,
}

impl RemoteApiRegistry {
    /// Connect to the API, failing fast when the liveness probe does not answer with
    /// the welcome sentinel.
    ///
    /// # Errors
    ///
    /// [`DiversityError::RegistryUnavailable`](crate::core::DiversityError::RegistryUnavailable)
    /// when the URL is unusable or the probe fails.
    pub async fn connect(options: RemoteRegistryOptions) -> Result<Self> {
        Self::connect_with_client(options, build_client()).await
    }

    /// [`connect`](Self::connect) with a caller-supplied HTTP client.
    pub async fn connect_with_client(options: RemoteRegistryOptions, client: Client) -> Result<Self> {
        let mut url = reqwest::Url::parse(&options.url)
            .map_err(|e| unavailable(&options.url, format!("invalid URL: {e}")))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        let url = url.to_string();

        let body = fetch_text(&client, &url)
            .await
            .map_err(|e| unavailable(&url, format!("{e:#}")))?
            .unwrap_or_default();
        if body.trim() != API_WELCOME_SENTINEL {
            return Err(unavailable(&url, "liveness probe did not return the welcome message"));
        }
        debug!("Connected to Diversity API at {}", url);

        Ok(Self {
            name: format!("remote:{url}"),
            validate: options.validate,
            ttl: options.ttl,
            responses: Cache::new("remote-responses", options.cache_max_entries),
            components: Cache::new("remote-components", options.cache_max_entries),
            client,
            url,
        })
    }

    /// Rename the registry (used in logs and compound registries).
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// API root, ending with `/`.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether a response for `url` is cached.
    pub fn cache_contains(&self, url: &str) -> bool {
        self.responses.contains(url)
    }

    /// Drop the cached response for `url`, or every cached response when `None`.
    pub fn cache_purge(&self, url: Option<&str>) {
        match url {
            Some(url) => {
                self.responses.invalidate(url);
            }
            None => {
                self.responses.invalidate_all();
                self.components.invalidate_all();
            }
        }
    }

    /// GET `url` as JSON through the response cache. `None` for 404.
    async fn call(&self, url: &str) -> Result<Option<Arc<Value>>> {
        let client = &self.client;
        let registry = self.name.as_str();
        self.responses
            .get_or_compute(url, self.ttl, move || async move {
                let Some(body) = fetch_text(client, url).await? else {
                    return Ok(None);
                };
                let value: Value = serde_json::from_str(&body)
                    .map_err(|e| unavailable(registry, format!("invalid JSON from {url}: {e}")))?;
                Ok(Some(Arc::new(value)))
            })
            .await
    }

    fn components_url(&self) -> String {
        format!("{}components/", self.url)
    }

    fn versions_url(&self, name: &str) -> String {
        format!("{}components/{name}", self.url)
    }

    fn files_url(&self, name: &str, version: &str) -> String {
        format!("{}components/{name}/{version}/files", self.url)
    }

    /// Versions of `name` as the server spells them, newest first.
    async fn labelled_versions(&self, name: &str) -> Result<Vec<(Version, String)>> {
        let Some(response) = self.call(&self.versions_url(name)).await? else {
            return Ok(Vec::new());
        };
        let Some(items) = response.as_array() else {
            return Err(unavailable(&self.name, format!("versions of '{name}' are not a list")));
        };

        let mut versions: Vec<(Version, String)> = items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(|label| match parse_version(label) {
                Ok(version) => Some((version, label.to_string())),
                Err(_) => {
                    debug!("Ignoring malformed version '{}' of {}", label, name);
                    None
                }
            })
            .collect();
        versions.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(versions)
    }

    async fn component_from_url(&self, spec_url: &str, base_url: String) -> Result<Option<Arc<Component>>> {
        let key = format!("component:{spec_url}:validate={}", self.validate);
        if let Some(component) = self.components.get(&key) {
            return Ok(Some(component));
        }

        let Some(spec) = self.call(spec_url).await? else {
            return Ok(None);
        };
        let options = ComponentOptions::default().with_base_url(base_url).with_validation(self.validate);
        let component = Arc::new(Component::from_spec(spec.as_ref().clone(), options)?);
        self.components.insert(key, Arc::clone(&component), self.ttl);
        Ok(Some(component))
    }
}

impl Registry for RemoteApiRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_component<'a>(
        &'a self,
        name: &'a str,
        requirement: Option<&'a VersionRequirement>,
    ) -> BoxFuture<'a, Result<Option<Arc<Component>>>> {
        Box::pin(async move {
            let versions = self.labelled_versions(name).await?;
            if versions.is_empty() {
                return Ok(None);
            }

            let chosen = versions
                .iter()
                .filter(|(v, _)| requirement.is_none_or(|req| req.satisfied_by(v)))
                .max_by(|a, b| a.0.cmp(&b.0));
            let Some((_, label)) = chosen else {
                let known: Vec<&str> = versions.iter().map(|(_, l)| l.as_str()).collect();
                warn!(
                    "No version of '{}' matches '{}' on {} (available: {})",
                    name,
                    requirement.map_or_else(|| "*".to_string(), ToString::to_string),
                    self.name,
                    known.join(", ")
                );
                return Ok(None);
            };

            let base_url = self.files_url(name, label);
            let spec_url = format!("{base_url}/{SPEC_FILE_NAME}");
            self.component_from_url(&spec_url, base_url).await
        })
    }

    fn list_versions<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<Version>>> {
        Box::pin(async move {
            Ok(self.labelled_versions(name).await?.into_iter().map(|(v, _)| v).collect())
        })
    }

    fn list_components(&self) -> BoxFuture<'_, Result<Listing>> {
        Box::pin(async move {
            let Some(response) = self.call(&self.components_url()).await? else {
                return Ok(Listing::new());
            };
            let Some(items) = response.as_array() else {
                return Err(unavailable(&self.name, "component list is not a list"));
            };

            let mut listing = Listing::new();
            for item in items {
                let name = match item {
                    Value::String(name) => name.as_str(),
                    other => match other.get("name").and_then(Value::as_str) {
                        Some(name) => name,
                        None => continue,
                    },
                };
                let versions = self.list_versions(name).await?;
                listing.insert(name.to_string(), versions);
            }
            Ok(listing)
        })
    }

    fn load_direct<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Option<Arc<Component>>>> {
        Box::pin(async move { self.component_from_url(url, parent_url(url)).await })
    }
}

impl std::fmt::Debug for RemoteApiRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteApiRegistry")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("validate", &self.validate)
            .finish_non_exhaustive()
    }
}
