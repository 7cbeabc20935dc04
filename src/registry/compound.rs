//! Ordered chain of registries.

use anyhow::Result;
use futures::future::BoxFuture;
use semver::Version;
use std::sync::Arc;
use tracing::debug;

use super::{Listing, Registry, merge_listing};
use crate::component::Component;
use crate::version::{VersionRequirement, sort_descending};

/// A registry asking named sub-registries in order; the first hit wins.
///
/// Listings are the union of every sub-registry's listing.
#[derive(Default)]
pub struct CompoundRegistry {
    entries: Vec<(String, Arc<dyn Registry>)>,
}

impl CompoundRegistry {
    /// An empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `registry` under `name` (its own name when `None`).
    pub fn add_registry(&mut self, registry: Arc<dyn Registry>, name: Option<&str>) {
        let name = name.map_or_else(|| registry.name().to_string(), str::to_string);
        self.entries.push((name, registry));
    }

    /// Builder form of [`add_registry`](Self::add_registry).
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<dyn Registry>, name: Option<&str>) -> Self {
        self.add_registry(registry, name);
        self
    }

    /// Names of the sub-registries in lookup order.
    pub fn registry_names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Number of sub-registries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Registry for CompoundRegistry {
    fn name(&self) -> &str {
        "compound"
    }

    fn get_component<'a>(
        &'a self,
        name: &'a str,
        requirement: Option<&'a VersionRequirement>,
    ) -> BoxFuture<'a, Result<Option<Arc<Component>>>> {
        Box::pin(async move {
            for (registry_name, registry) in &self.entries {
                if let Some(found) = registry.get_component(name, requirement).await? {
                    debug!("{} found in registry '{}'", found, registry_name);
                    return Ok(Some(found));
                }
            }
            Ok(None)
        })
    }

    fn list_versions<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<Version>>> {
        Box::pin(async move {
            let mut versions = Vec::new();
            for (_, registry) in &self.entries {
                for version in registry.list_versions(name).await? {
                    if !versions.contains(&version) {
                        versions.push(version);
                    }
                }
            }
            sort_descending(&mut versions);
            Ok(versions)
        })
    }

    fn list_components(&self) -> BoxFuture<'_, Result<Listing>> {
        Box::pin(async move {
            let mut listing = Listing::new();
            for (_, registry) in &self.entries {
                merge_listing(&mut listing, registry.list_components().await?);
            }
            Ok(listing)
        })
    }

    fn load_direct<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Option<Arc<Component>>>> {
        Box::pin(async move {
            for (_, registry) in &self.entries {
                if let Some(found) = registry.load_direct(url).await? {
                    return Ok(Some(found));
                }
            }
            Ok(None)
        })
    }
}

impl std::fmt::Debug for CompoundRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompoundRegistry").field("registries", &self.registry_names()).finish()
    }
}
