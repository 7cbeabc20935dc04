//! Per-render collection of contributing components and the root manifests built
//! from it.

use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

use crate::assets::AssetLoader;
use crate::component::Component;
use crate::resolver::ResolvedSet;

/// Components contributing to one render, in discovery order.
///
/// Each render call owns its aggregation; nested renders build their own and fold
/// it into the parent's when done.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    components: Vec<Arc<Component>>,
    seen: HashSet<String>,
}

impl Aggregation {
    /// An empty aggregation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add components not seen before, keeping their order.
    pub fn fold<'a>(&mut self, components: impl IntoIterator<Item = &'a Arc<Component>>) {
        for component in components {
            if self.seen.insert(component.identity()) {
                self.components.push(Arc::clone(component));
            }
        }
    }

    /// Collected components in discovery order.
    pub fn components(&self) -> &[Arc<Component>] {
        &self.components
    }

    /// The collected components with name conflicts resolved.
    pub fn resolve(&self) -> ResolvedSet {
        ResolvedSet::from_components(self.components.clone())
    }
}

/// Asset URLs de-duplicated by final location, first occurrence wins.
pub fn collect_urls(set: &ResolvedSet, urls: impl Fn(&Component) -> Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for component in set {
        for url in urls(component.as_ref()) {
            if seen.insert(url.clone()) {
                out.push(url);
            }
        }
    }
    out
}

/// Angular module names in resolved order.
pub fn angular_modules(set: &ResolvedSet) -> Vec<String> {
    set.iter().filter_map(|c| c.angular_module().map(str::to_string)).collect()
}

/// The bootstrap call for `modules`.
pub fn angular_bootstrap(modules: &[String]) -> String {
    let list = serde_json::to_string(modules).unwrap_or_else(|_| "[]".to_string());
    format!("angular.bootstrap(document,{list});")
}

/// Translation bundles for `language`: one `{component, messages}` entry per component
/// declaring one. Messages are parsed as JSON when possible.
pub async fn l10n(set: &ResolvedSet, language: &str, loader: &dyn AssetLoader) -> Vec<Value> {
    let mut bundles = Vec::new();
    for component in set {
        let Some(path) = component.locales().get(language) else {
            continue;
        };
        let location = component.asset_location(path);
        match loader.load(&location).await {
            Some(text) => {
                let messages = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
                bundles.push(json!({ "component": component.name(), "messages": messages }));
            }
            None => warn!("Skipping missing '{}' translations of {}", language, component),
        }
    }
    bundles
}
