//! Template rendering.
//!
//! The engine hands each component's template text and a JSON namespace to a
//! [`TemplateRenderer`]. The default [`TeraRenderer`] uses Tera, whose
//! `{{ settings.title }}` expressions read the same as the component templates in
//! the registry. Nested components arrive pre-rendered under
//! `settings.<key>.componentHTML` and are emitted unescaped.
//!
//! # Namespace
//!
//! | Key                | Present      | Content                                         |
//! |--------------------|--------------|-------------------------------------------------|
//! | `settings`         | always       | expanded settings                               |
//! | `settingsJSON`     | always       | `settings` as JSON, `</script>` escaped         |
//! | `context`          | always       | resolved component context                      |
//! | `baseUrl`          | always       | component base URL (or null)                    |
//! | `lang`             | always       | active language                                 |
//! | `scripts`/`styles` | root only    | aggregated asset URLs                           |
//! | `angular`          | root only    | angular module names                            |
//! | `angularBootstrap` | root only    | `angular.bootstrap(document,[...]);`            |
//! | `l10n`             | root only    | `[{component, messages}]` for `lang`            |
//! | `minifiedJs`       | root, opt-in | inlined script bundle                           |
//!
//! # Filters
//!
//! - `currency`: replaces the word `currency` with the shop currency
//! - `gettext`: identity, reserved for translations
//! - `lang`: replaces the word `lang` with the active language

pub mod filters;
mod renderer;

pub use renderer::TeraRenderer;

use anyhow::Result;
use serde_json::{Map, Value};

/// Renders template text against a namespace.
pub trait TemplateRenderer: Send + Sync {
    /// Render `template` with the variables in `namespace`.
    fn render(&self, template: &str, namespace: &Map<String, Value>) -> Result<String>;
}
