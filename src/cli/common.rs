//! Helpers shared by the commands.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use strsim::levenshtein;

use crate::component::Component;
use crate::config::DiversityConfig;
use crate::core::DiversityError;
use crate::registry::{LocalRegistry, Registry};
use crate::version::VersionRequirement;

/// Closest-match suggestions must be within this share of the name's length.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// How a command prints its result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// JSON on one line
    Json,
}

/// The configured registries as one.
pub async fn open_registry(config: &DiversityConfig) -> Result<Arc<dyn Registry>> {
    Ok(Arc::new(config.build_registry().await?))
}

/// The configured local registry; install and uninstall need one.
pub fn require_local(config: &DiversityConfig) -> Result<LocalRegistry> {
    config.build_local()?.ok_or_else(|| {
        DiversityError::ConfigError {
            message: "no local registry configured; add a [local] section".to_string(),
        }
        .into()
    })
}

pub fn parse_requirement(text: Option<&str>) -> Result<Option<VersionRequirement>> {
    text.map(VersionRequirement::parse).transpose()
}

/// Read a JSON document; no path gives `null`.
pub async fn read_json(path: Option<&Path>) -> Result<Value> {
    let Some(path) = path else {
        return Ok(Value::Null);
    };
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Look a component up, suggesting similar names when there is none.
pub async fn find_component(
    registry: &Arc<dyn Registry>,
    name: &str,
    requirement: Option<&VersionRequirement>,
) -> Result<Arc<Component>> {
    if let Some(component) = registry.get_component(name, requirement).await? {
        return Ok(component);
    }

    let error: anyhow::Error = DiversityError::ComponentNotFound {
        name: name.to_string(),
        requirement: requirement.map_or_else(|| "*".to_string(), ToString::to_string),
        path: "/".to_string(),
    }
    .into();

    let known: Vec<String> = registry.list_components().await.map(|l| l.into_keys().collect()).unwrap_or_default();
    let similar = similar_names(name, &known);
    if similar.is_empty() {
        Err(error)
    } else {
        Err(error.context(format!("Did you mean: {}?", similar.join(", "))))
    }
}

/// Up to three names closest to `target` by edit distance.
pub fn similar_names(target: &str, available: &[String]) -> Vec<String> {
    let mut scored: Vec<_> = available
        .iter()
        .filter(|name| name.as_str() != target)
        .map(|name| (name.clone(), levenshtein(target, name)))
        .collect();

    scored.sort_by_key(|(_, distance)| *distance);

    scored
        .into_iter()
        .filter(|(_, distance)| *distance <= target.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
        .take(3)
        .map(|(name, _)| name)
        .collect()
}
