//! Dependency expansion and conflict resolution.
//!
//! [`ComponentSet::expand`] turns root components into a [`ResolvedSet`]: every
//! transitive dependency appears exactly once and before anything that depends on it.
//!
//! # Algorithm
//!
//! Expansion is depth-first. For each component, each declared dependency is resolved
//! (range requirements through [`Registry::get_component`], URLs through
//! [`Registry::load_direct`]), that dependency's own dependencies are expanded first,
//! then the dependency itself is appended, and finally the component. Duplicate
//! identities keep their first position.
//!
//! The expanded list is then grouped by name. When a name appears with more than one
//! version only the highest survives, taking the position of the group's first entry.
//! This applies to roots too: a root can be displaced by a higher version of the same
//! name requested further down the tree. A survivor moved ahead of its own
//! dependencies this way is pushed back behind them.
//!
//! ```text
//! conflicted ─┬─ alpha 1.0.0
//!             └─ beta ── alpha ^1.5  (→ 1.5.0)
//!
//! expanded: alpha:1.0.0, alpha:1.5.0, beta:1.0.0, conflicted:1.0.0
//! resolved: alpha:1.5.0, beta:1.0.0, conflicted:1.0.0
//! ```

use anyhow::Result;
use futures::future::BoxFuture;
use semver::Version;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::component::{Component, Dependency, Requirement};
use crate::core::DiversityError;
use crate::registry::Registry;

/// Expands root components against a registry.
#[derive(Clone)]
pub struct ComponentSet {
    registry: Arc<dyn Registry>,
}

/// Mutable state of one expansion.
#[derive(Default)]
struct Expansion {
    ordered: Vec<Arc<Component>>,
    seen: HashSet<String>,
    chain: Vec<String>,
}

impl ComponentSet {
    /// Create a set resolving dependencies through `registry`.
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self {
            registry,
        }
    }

    /// The registry dependencies are resolved through.
    pub fn registry(&self) -> &Arc<dyn Registry> {
        &self.registry
    }

    /// Expand `roots` into a conflict-free, dependency-ordered set.
    ///
    /// # Errors
    ///
    /// - [`DiversityError::UnresolvedDependency`] when no component satisfies a
    ///   declared dependency
    /// - [`DiversityError::CircularDependency`] when a component depends on itself,
    ///   directly or transitively
    /// - any registry error
    pub async fn expand(&self, roots: &[Arc<Component>]) -> Result<ResolvedSet> {
        let mut state = Expansion::default();
        for root in roots {
            self.expand_component(Arc::clone(root), &mut state).await?;
        }
        Ok(ResolvedSet::from_components(state.ordered))
    }

    fn expand_component<'a>(
        &'a self,
        component: Arc<Component>,
        state: &'a mut Expansion,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let identity = component.identity();
            if state.chain.contains(&identity) {
                let mut chain = state.chain.clone();
                chain.push(identity);
                return Err(DiversityError::CircularDependency {
                    chain: chain.join(" -> "),
                }
                .into());
            }
            if state.seen.contains(&identity) {
                return Ok(());
            }

            state.chain.push(identity.clone());
            for dependency in component.dependencies() {
                let resolved = self.resolve_dependency(&component, dependency).await?;
                debug!("{} asks for {} {} → {}", component, dependency.name, dependency.requirement, resolved);
                self.expand_component(resolved, state).await?;
            }
            state.chain.pop();

            state.seen.insert(identity);
            state.ordered.push(component);
            Ok(())
        })
    }

    async fn resolve_dependency(&self, requester: &Component, dependency: &Dependency) -> Result<Arc<Component>> {
        let found = match &dependency.requirement {
            Requirement::Range(requirement) => {
                self.registry.get_component(&dependency.name, Some(requirement)).await?
            }
            Requirement::Direct(url) => self.registry.load_direct(url).await?,
        };

        found.ok_or_else(|| {
            DiversityError::UnresolvedDependency {
                requester: requester.identity(),
                dependency: dependency.name.clone(),
                requirement: dependency.requirement.to_string(),
            }
            .into()
        })
    }
}

impl std::fmt::Debug for ComponentSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentSet").field("registry", &self.registry.name()).finish()
    }
}

/// An ordered, conflict-free set of components: one version per name, dependencies
/// before dependents.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSet {
    components: Vec<Arc<Component>>,
    discarded: Vec<Arc<Component>>,
}

impl ResolvedSet {
    /// Resolve name conflicts in a dependency-ordered list.
    pub(crate) fn from_components(expanded: Vec<Arc<Component>>) -> Self {
        let mut seen = HashSet::new();
        let mut groups: Vec<Vec<Arc<Component>>> = Vec::new();
        for component in expanded {
            if !seen.insert(component.identity()) {
                continue;
            }
            match groups.iter_mut().find(|group| group[0].name() == component.name()) {
                Some(group) => group.push(component),
                None => groups.push(vec![component]),
            }
        }

        let mut components = Vec::with_capacity(groups.len());
        let mut discarded = Vec::new();
        for mut group in groups {
            if group.len() > 1 {
                let versions: Vec<String> = group.iter().map(|c| c.version().to_string()).collect();
                warn!(
                    "More than one version of component {} requested [{}]",
                    group[0].name(),
                    versions.join(", ")
                );
            }

            let mut best = 0;
            for (idx, candidate) in group.iter().enumerate() {
                if candidate.version() > group[best].version() {
                    best = idx;
                }
            }
            let winner = group.remove(best);
            discarded.extend(group);
            components.push(winner);
        }

        Self {
            components: dependencies_first(components),
            discarded,
        }
    }

    /// Surviving components in order.
    pub fn components(&self) -> &[Arc<Component>] {
        &self.components
    }

    /// Lower versions dropped by conflict resolution.
    pub fn discarded(&self) -> &[Arc<Component>] {
        &self.discarded
    }

    /// `(name, version)` pairs in order.
    pub fn identities(&self) -> Vec<(String, Version)> {
        self.components.iter().map(|c| (c.name().to_string(), c.version().clone())).collect()
    }

    /// The surviving component called `name`.
    pub fn get(&self, name: &str) -> Option<&Arc<Component>> {
        self.components.iter().find(|c| c.name() == name)
    }

    /// Position of `name` in the order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.components.iter().position(|c| c.name() == name)
    }

    /// Iterate in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Component>> {
        self.components.iter()
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Take the surviving components.
    pub fn into_vec(self) -> Vec<Arc<Component>> {
        self.components
    }
}

/// Reorder survivors so each follows the survivors it depends on, otherwise keeping
/// the given order. A winner taking its group's first position can land ahead of
/// its own dependencies.
fn dependencies_first(components: Vec<Arc<Component>>) -> Vec<Arc<Component>> {
    fn visit(
        idx: usize,
        components: &[Arc<Component>],
        placed: &mut [bool],
        ordered: &mut Vec<Arc<Component>>,
    ) {
        if placed[idx] {
            return;
        }
        placed[idx] = true;
        for dependency in components[idx].dependencies() {
            if let Some(dep_idx) = components.iter().position(|c| c.name() == dependency.name) {
                visit(dep_idx, components, placed, ordered);
            }
        }
        ordered.push(Arc::clone(&components[idx]));
    }

    let mut placed = vec![false; components.len()];
    let mut ordered = Vec::with_capacity(components.len());
    for idx in 0..components.len() {
        visit(idx, &components, &mut placed, &mut ordered);
    }
    ordered
}

impl<'a> IntoIterator for &'a ResolvedSet {
    type Item = &'a Arc<Component>;
    type IntoIter = std::slice::Iter<'a, Arc<Component>>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.iter()
    }
}

#[cfg(test)]
mod tests;
