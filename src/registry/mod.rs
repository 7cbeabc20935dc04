//! Component registries.
//!
//! A [`Registry`] finds components by name and optional version requirement. Three
//! implementations share the version selection logic defined here:
//!
//! - [`LocalRegistry`]: a directory tree `<base>/<name>/<version>/diversity.json`
//!   with install/uninstall support and an optional fallback registry
//! - [`RemoteApiRegistry`]: a Diversity API server over HTTP, with cached responses
//! - [`CompoundRegistry`]: an ordered chain of named registries; first hit wins
//!
//! All methods return boxed futures so registries can be used as
//! `Arc<dyn Registry>` and composed freely.

pub mod compound;
pub mod file_ops;
pub mod local;
pub mod remote;

pub use compound::CompoundRegistry;
pub use file_ops::{FileMode, FileOps};
pub use local::{LocalRegistry, LocalRegistryOptions};
pub use remote::{RemoteApiRegistry, RemoteRegistryOptions};

use anyhow::Result;
use futures::future::BoxFuture;
use reqwest::Client;
use semver::Version;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::assets::http::fetch_text;
use crate::component::{Component, ComponentOptions};
use crate::core::DiversityError;
use crate::version::VersionRequirement;

/// Component name → known versions, newest first.
pub type Listing = BTreeMap<String, Vec<Version>>;

/// A source of components.
pub trait Registry: Send + Sync {
    /// Name used in logs and compound registries.
    fn name(&self) -> &str;

    /// Return the highest version of `name` satisfying `requirement` (any version when
    /// `None`), or `None` when this registry cannot provide one.
    fn get_component<'a>(
        &'a self,
        name: &'a str,
        requirement: Option<&'a VersionRequirement>,
    ) -> BoxFuture<'a, Result<Option<Arc<Component>>>>;

    /// All known versions of `name`, newest first.
    fn list_versions<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<Version>>>;

    /// Every known component with its versions.
    fn list_components(&self) -> BoxFuture<'_, Result<Listing>>;

    /// Load a component from a direct spec URL.
    fn load_direct<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Option<Arc<Component>>>>;

    /// Whether some version of `name` satisfies `requirement`.
    fn is_available<'a>(
        &'a self,
        name: &'a str,
        requirement: Option<&'a VersionRequirement>,
    ) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let versions = self.list_versions(name).await?;
            Ok(select_version(&versions, requirement).is_some())
        })
    }
}

/// Versions satisfying `requirement`, in input order.
pub fn matching_versions(
    versions: &[Version],
    requirement: Option<&VersionRequirement>,
) -> Vec<Version> {
    versions
        .iter()
        .filter(|v| requirement.is_none_or(|req| req.satisfied_by(v)))
        .cloned()
        .collect()
}

/// The highest version satisfying `requirement`.
pub fn select_version(
    versions: &[Version],
    requirement: Option<&VersionRequirement>,
) -> Option<Version> {
    versions.iter().filter(|v| requirement.is_none_or(|req| req.satisfied_by(v))).max().cloned()
}

/// Merge `other` into `listing`, de-duplicating versions and keeping newest first.
pub fn merge_listing(listing: &mut Listing, other: Listing) {
    for (name, versions) in other {
        let entry = listing.entry(name).or_default();
        for version in versions {
            if !entry.contains(&version) {
                entry.push(version);
            }
        }
        crate::version::sort_descending(entry);
    }
}

/// The URL "directory" containing `url`, without a trailing slash.
pub(crate) fn parent_url(url: &str) -> String {
    let trimmed = url.split(['?', '#']).next().unwrap_or(url);
    match trimmed.rfind('/') {
        Some(idx) if idx > 0 && !trimmed[..idx].ends_with('/') => trimmed[..idx].to_string(),
        _ => trimmed.trim_end_matches('/').to_string(),
    }
}

/// Fetch a spec from a direct URL; its parent URL becomes the component's base URL.
pub(crate) async fn fetch_direct(
    client: &Client,
    url: &str,
    validate: bool,
) -> Result<Option<Arc<Component>>> {
    let Some(text) = fetch_text(client, url).await? else {
        return Ok(None);
    };

    let options = ComponentOptions::default().with_base_url(parent_url(url)).with_validation(validate);
    let component = Component::from_json_str(&text, url, options)?;
    Ok(Some(Arc::new(component)))
}

/// Error for a registry that answered something it should not have.
pub(crate) fn unavailable(registry: &str, reason: impl Into<String>) -> anyhow::Error {
    DiversityError::RegistryUnavailable {
        registry: registry.to_string(),
        reason: reason.into(),
    }
    .into()
}
