//! Diversity - versioned UI components, resolved and rendered
//!
//! Diversity serves HTML fragments built from versioned components. A component is a
//! `diversity.json` spec plus its templates, scripts, and styles. Components declare
//! semver dependencies on each other and nest other components through their settings.
//!
//! # Architecture Overview
//!
//! ```text
//! Registry ──► Resolver ──► Engine ──► HTML
//!    │            │            │
//!    │            │            ├─ settings walk (nested components)
//!    │            │            ├─ template rendering (Tera)
//!    │            │            └─ root manifests (scripts, styles, angular, l10n)
//!    │            └─ dependency expansion + conflict resolution
//!    └─ local tree / remote API / compound chain
//! ```
//!
//! - A [`registry::Registry`] finds a component by name and version requirement.
//! - [`resolver::ComponentSet::expand`] turns root components into an ordered,
//!   conflict-free [`resolver::ResolvedSet`].
//! - [`engine::Engine::render`] renders a component with settings and context,
//!   recursively rendering nested components and collecting every asset they need.
//! - [`cache::Cache`] backs schema, listing, response, and fragment caching.
//!
//! # Core Modules
//!
//! - [`component`] - Component specs, dependencies, and the master schema
//! - [`version`] - Lenient version parsing and [`version::VersionRequirement`]
//! - [`registry`] - [`registry::LocalRegistry`], [`registry::RemoteApiRegistry`],
//!   [`registry::CompoundRegistry`]
//! - [`resolver`] - Dependency expansion
//! - [`engine`] - The render engine
//! - [`cache`] - TTL + LRU cache with single-flight computation
//!
//! # Collaborators
//!
//! - [`assets`] - Loading assets from disk or HTTP, bundle compression
//! - [`schema`] - JSON Schema validation
//! - [`templating`] - Template rendering
//! - [`context`] - JSON-RPC context resolution
//!
//! # Supporting Modules
//!
//! - [`cli`] - The `diversity` command
//! - [`config`] - `~/.diversity/config.toml`
//! - [`core`] - Error types and user-facing error reporting
//! - [`constants`] - Defaults shared across modules
//! - [`utils`] - Atomic writes and location joining
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use diversity::engine::{Engine, EngineOptions, RenderContext};
//! use diversity::registry::{LocalRegistry, LocalRegistryOptions, Registry};
//! use diversity::resolver::ComponentSet;
//! use serde_json::json;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry: Arc<dyn Registry> = Arc::new(LocalRegistry::new(
//!     LocalRegistryOptions::new("/srv/components").with_base_url("http://localhost/components"),
//! )?);
//!
//! let page = registry.get_component("page", None).await?.expect("installed");
//!
//! let resolved = ComponentSet::new(registry.clone()).expand(&[page.clone()]).await?;
//! for component in &resolved {
//!     println!("{component}");
//! }
//!
//! let engine = Engine::new(registry, EngineOptions::default());
//! let html = engine.render(&page, &RenderContext::new(), &json!({ "title": "Welcome" })).await?;
//! # Ok(())
//! # }
//! ```

// Core functionality modules
pub mod cache;
pub mod component;
pub mod engine;
pub mod registry;
pub mod resolver;
pub mod version;

// Collaborators
pub mod assets;
pub mod context;
pub mod schema;
pub mod templating;

// Supporting modules
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
