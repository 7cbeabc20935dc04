//! The render engine.
//!
//! [`Engine::render`] turns a component, a render context, and a settings document
//! into markup. Per call it moves through these states:
//!
//! ```text
//! Validating → ExpandingDependencies → WalkingSettings → RenderingTemplate → Done
//!      └──────────────┴──────────────────────┴──────────────────┴──→ Failed
//! ```
//!
//! 1. **Validating**: settings are checked against the component's settings schema.
//!    Failures are logged and rendering continues.
//! 2. **ExpandingDependencies**: the component's dependency set is resolved and folded
//!    into the call's [`Aggregation`].
//! 3. **WalkingSettings**: the settings are walked against the schema. Every value
//!    under a `format: "diversity"` node is a `{component, version, settings}`
//!    reference; the referenced component is rendered at that path and the value is
//!    replaced with `{"componentHTML": markup}`.
//! 4. **RenderingTemplate**: the component's templates are rendered with the expanded
//!    settings, the resolved backend context and, at the root only, the aggregated
//!    script/style/angular/l10n manifests.
//!
//! Rendered fragments are cached by component checksum, settings, and context, so a
//! repeated render never walks or renders again; a cache hit still contributes its
//! components to the enclosing aggregation.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use diversity::engine::{Engine, EngineOptions, RenderContext};
//! use diversity::registry::{LocalRegistry, LocalRegistryOptions, Registry};
//! use serde_json::json;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = Arc::new(LocalRegistry::new(LocalRegistryOptions::new("/srv/components"))?);
//! let engine = Engine::new(registry.clone(), EngineOptions::default());
//!
//! let page = registry.get_component("page", None).await?.expect("installed");
//! let html = engine
//!     .render(&page, &RenderContext::new().with_language("en"), &json!({"title": "Hi"}))
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod aggregation;
mod bundle;
mod settings;

pub use aggregation::Aggregation;
pub use settings::{PathSegment, SettingsPath, Slot};

use anyhow::Result;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::assets::{AssetKind, AssetLoader, Compressor, DefaultAssetLoader, LineCompressor};
use crate::cache::Cache;
use crate::component::{Component, write_canonical};
use crate::constants::{
    CONTEXT_BACKEND_URL, CONTEXT_LANGUAGE, DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_LANGUAGE,
    default_fragment_ttl, default_schema_ttl,
};
use crate::context::{ContextResolver, JsonRpcContextResolver};
use crate::core::DiversityError;
use crate::registry::Registry;
use crate::resolver::ComponentSet;
use crate::schema::{JsonSchemaValidator, SchemaValidator};
use crate::templating::{TemplateRenderer, TeraRenderer};
use crate::version::VersionRequirement;

/// Script/style bundling options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinificationOptions {
    /// Directory bundles are written to
    pub base_dir: PathBuf,
    /// URL under which `base_dir` is served
    pub base_url: String,
    /// Bundle scripts
    pub minify_js: bool,
    /// Bundle styles
    pub minify_css: bool,
    /// Also bundle remote assets
    pub minify_remotes: bool,
    /// Inline the script bundle as `minifiedJs` instead of linking it
    pub inline_js: bool,
}

impl Default for MinificationOptions {
    fn default() -> Self {
        Self {
            base_dir: std::env::temp_dir().join("diversity").join("minified"),
            base_url: "/minified".to_string(),
            minify_js: false,
            minify_css: false,
            minify_remotes: false,
            inline_js: false,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Backend for context resolution when the render context names none
    pub backend_url: Option<String>,
    /// Validate settings against settings schemas (never fatal)
    pub validate_settings: bool,
    /// Bundling
    pub minification: MinificationOptions,
    /// TTL of rendered fragments
    pub fragment_ttl: Duration,
    /// TTL of side-loaded settings schemas
    pub schema_ttl: Duration,
    /// Bound for the schema and fragment caches
    pub cache_max_entries: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            backend_url: None,
            validate_settings: true,
            minification: MinificationOptions::default(),
            fragment_ttl: default_fragment_ttl(),
            schema_ttl: default_schema_ttl(),
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

/// Caller-supplied render context.
///
/// Opaque to the engine apart from `backendURL` and `language`; the whole map is handed
/// to the [`ContextResolver`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    values: Map<String, Value>,
}

impl RenderContext {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing map.
    pub const fn from_map(values: Map<String, Value>) -> Self {
        Self {
            values,
        }
    }

    /// Build from a JSON object; `null` gives an empty context.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(values) => Ok(Self::from_map(values)),
            Value::Null => Ok(Self::new()),
            other => Err(DiversityError::ConfigError {
                message: format!("render context must be a JSON object, got {other}"),
            }
            .into()),
        }
    }

    /// Set the active language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.values.insert(CONTEXT_LANGUAGE.to_string(), Value::String(language.into()));
        self
    }

    /// Set the backend URL.
    #[must_use]
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.values.insert(CONTEXT_BACKEND_URL.to_string(), Value::String(url.into()));
        self
    }

    /// Set any value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// `backendURL`, when set.
    pub fn backend_url(&self) -> Option<&str> {
        self.values.get(CONTEXT_BACKEND_URL).and_then(Value::as_str)
    }

    /// `language`, when set.
    pub fn language(&self) -> Option<&str> {
        self.values.get(CONTEXT_LANGUAGE).and_then(Value::as_str)
    }

    /// The raw values.
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }
}

/// A cached render result.
#[derive(Debug, Clone)]
struct Fragment {
    markup: String,
    components: Vec<Arc<Component>>,
}

/// Renders components recursively.
pub struct Engine {
    registry: Arc<dyn Registry>,
    resolver: ComponentSet,
    options: EngineOptions,
    validator: Arc<dyn SchemaValidator>,
    renderer: Arc<dyn TemplateRenderer>,
    context_resolver: Arc<dyn ContextResolver>,
    loader: Arc<dyn AssetLoader>,
    compressor: Arc<dyn Compressor>,
    schemas: Cache<Arc<Value>>,
    fragments: Cache<Fragment>,
}

impl Engine {
    /// Create an engine with the default collaborators: jsonschema validation, Tera
    /// templates, JSON-RPC context, file/HTTP assets, and line compression.
    pub fn new(registry: Arc<dyn Registry>, options: EngineOptions) -> Self {
        Self {
            resolver: ComponentSet::new(Arc::clone(&registry)),
            registry,
            validator: Arc::new(JsonSchemaValidator::new()),
            renderer: Arc::new(TeraRenderer::new()),
            context_resolver: Arc::new(JsonRpcContextResolver::new()),
            loader: Arc::new(DefaultAssetLoader::new()),
            compressor: Arc::new(LineCompressor),
            schemas: Cache::new("settings-schemas", options.cache_max_entries),
            fragments: Cache::new("fragments", options.cache_max_entries),
            options,
        }
    }

    /// Replace the settings validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Replace the template renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Replace the context resolver.
    #[must_use]
    pub fn with_context_resolver(mut self, resolver: Arc<dyn ContextResolver>) -> Self {
        self.context_resolver = resolver;
        self
    }

    /// Replace the asset loader.
    #[must_use]
    pub fn with_asset_loader(mut self, loader: Arc<dyn AssetLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Replace the bundle compressor.
    #[must_use]
    pub fn with_compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = compressor;
        self
    }

    /// The engine's registry.
    pub fn registry(&self) -> &Arc<dyn Registry> {
        &self.registry
    }

    /// The engine's options.
    pub const fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Drop every cached fragment and side-loaded schema.
    pub fn clear_caches(&self) {
        self.fragments.invalidate_all();
        self.schemas.invalidate_all();
    }

    /// Render `component` as the root of a page.
    ///
    /// # Errors
    ///
    /// - [`DiversityError::UnresolvedDependency`] / [`DiversityError::CircularDependency`]
    ///   from dependency expansion
    /// - [`DiversityError::ComponentNotFound`] for a nested reference no registry has
    /// - [`DiversityError::AssetNotFound`] for a declared template that cannot be loaded
    /// - context resolution and template errors
    pub async fn render(&self, component: &Arc<Component>, context: &RenderContext, settings: &Value) -> Result<String> {
        let mut aggregation = Aggregation::new();
        self.render_at(Arc::clone(component), context, settings.clone(), SettingsPath::root(), &mut aggregation)
            .await
    }

    /// Look up `name` and render it as the root of a page.
    pub async fn render_named(
        &self,
        name: &str,
        requirement: Option<&VersionRequirement>,
        context: &RenderContext,
        settings: &Value,
    ) -> Result<String> {
        let component = self.registry.get_component(name, requirement).await?.ok_or_else(|| {
            DiversityError::ComponentNotFound {
                name: name.to_string(),
                requirement: requirement.map_or_else(|| "*".to_string(), ToString::to_string),
                path: SettingsPath::root().to_string(),
            }
        })?;
        self.render(&component, context, settings).await
    }

    fn render_at<'a>(
        &'a self,
        component: Arc<Component>,
        context: &'a RenderContext,
        settings: Value,
        path: SettingsPath,
        parent: &'a mut Aggregation,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let key = self.fragment_key(&component, context, &settings, path.is_root());
            let fragment = self
                .fragments
                .get_or_compute(&key, self.options.fragment_ttl, || {
                    self.render_uncached(Arc::clone(&component), context, settings, path)
                })
                .await?;

            parent.fold(&fragment.components);
            Ok(fragment.markup)
        })
    }

    async fn render_uncached(
        &self,
        component: Arc<Component>,
        context: &RenderContext,
        settings: Value,
        path: SettingsPath,
    ) -> Result<Fragment> {
        debug!("Rendering {} at {}", component, path);
        let mut local = Aggregation::new();

        // Validating
        let schema = self.settings_schema(&component).await;
        if self.options.validate_settings {
            let errors = self.validator.validate(&schema, &settings);
            if !errors.is_empty() {
                warn!("Settings for {} at {} failed validation: {}", component, path, errors.join("; "));
            }
        }

        // ExpandingDependencies
        let resolved = self.resolver.expand(std::slice::from_ref(&component)).await?;
        local.fold(resolved.components());

        // WalkingSettings
        let expanded = self.expand_settings(&component, &schema, &settings, &path, context, &mut local).await?;

        // RenderingTemplate
        let markup = self.render_template(&component, context, &expanded, &path, &local).await?;
        Ok(Fragment {
            markup,
            components: local.components().to_vec(),
        })
    }

    /// The component's settings schema, side-loading it when the spec names a file.
    async fn settings_schema(&self, component: &Component) -> Arc<Value> {
        let Some(source) = component.settings_schema_source() else {
            return Arc::new(component.settings_schema().clone());
        };

        let location = component.asset_location(source);
        let key = format!("schema:{location}");
        let loader = self.loader.as_ref();
        let target = location.as_str();
        let loaded = self
            .schemas
            .get_or_compute(&key, self.options.schema_ttl, move || async move {
                let schema = match loader.load(target).await {
                    Some(text) => serde_json::from_str::<Value>(&text).unwrap_or_else(|e| {
                        warn!("Settings schema '{}' of {} is not JSON: {}", source, component, e);
                        Value::Object(Map::new())
                    }),
                    None => {
                        warn!("Settings schema '{}' of {} could not be loaded", source, component);
                        Value::Object(Map::new())
                    }
                };
                anyhow::Ok(Arc::new(schema))
            })
            .await;

        loaded.unwrap_or_else(|e| {
            warn!("Settings schema cache failed for {}: {:#}", component, e);
            Arc::new(Value::Object(Map::new()))
        })
    }

    /// Walk `settings` against `schema`, rendering every nested component reference.
    async fn expand_settings(
        &self,
        component: &Component,
        schema: &Value,
        settings: &Value,
        path: &SettingsPath,
        context: &RenderContext,
        local: &mut Aggregation,
    ) -> Result<Value> {
        let owner = component.to_string();
        let mut slots = Vec::new();
        let mut expanded = settings::collect_slots(schema, settings, path, &owner, &mut slots);
        slots.sort_by(|a, b| a.path.cmp(&b.path));

        for slot in slots {
            let Some(reference) = slot.reference.as_object() else {
                warn!("Keeping non-object component reference at {} of {} unexpanded", slot.path, owner);
                continue;
            };
            let (nested, nested_settings) = self.resolve_reference(reference, &slot.path).await?;
            let markup = self.render_at(nested, context, nested_settings, slot.path.clone(), local).await?;

            let relative = slot.path.strip_prefix(path).unwrap_or_default();
            if !settings::splice(&mut expanded, relative, markup) {
                warn!("Could not place rendered component at {} of {}", slot.path, owner);
            }
        }
        Ok(expanded)
    }

    /// Look up the component a `{component, version, settings}` reference names.
    async fn resolve_reference(
        &self,
        reference: &Map<String, Value>,
        path: &SettingsPath,
    ) -> Result<(Arc<Component>, Value)> {
        let name = reference.get("component").and_then(Value::as_str).unwrap_or_default();
        let requirement = match reference.get("version") {
            Some(Value::String(text)) => Some(VersionRequirement::parse(text)?),
            Some(Value::Null) | None => None,
            Some(other) => Some(VersionRequirement::parse(&other.to_string())?),
        };

        let found = if name.is_empty() {
            None
        } else {
            self.registry.get_component(name, requirement.as_ref()).await?
        };
        let component = found.ok_or_else(|| DiversityError::ComponentNotFound {
            name: if name.is_empty() { "<unnamed>".to_string() } else { name.to_string() },
            requirement: requirement.as_ref().map_or_else(|| "*".to_string(), ToString::to_string),
            path: path.to_string(),
        })?;

        let settings = reference.get("settings").cloned().unwrap_or(Value::Null);
        Ok((component, settings))
    }

    async fn render_template(
        &self,
        component: &Component,
        context: &RenderContext,
        settings: &Value,
        path: &SettingsPath,
        local: &Aggregation,
    ) -> Result<String> {
        if component.templates().is_empty() {
            debug!("{} has no template", component);
            return Ok(String::new());
        }

        let mut template = String::new();
        for declared in component.templates() {
            let location = component.asset_location(declared);
            let text = self.loader.load(&location).await.ok_or_else(|| DiversityError::AssetNotFound {
                component: component.to_string(),
                path: declared.clone(),
            })?;
            template.push_str(&text);
        }

        let language = context.language().unwrap_or(DEFAULT_LANGUAGE).to_string();
        let backend_url = context.backend_url().or(self.options.backend_url.as_deref());
        let resolved_context = self.context_resolver.resolve_context(backend_url, component, context.as_map()).await?;

        let mut namespace = Map::new();
        namespace.insert("settings".to_string(), settings.clone());
        namespace.insert("settingsJSON".to_string(), Value::String(script_safe_json(settings)));
        namespace.insert("context".to_string(), Value::Object(resolved_context));
        namespace.insert(
            "baseUrl".to_string(),
            component.base_url().map_or(Value::Null, |url| Value::String(url.to_string())),
        );
        namespace.insert("lang".to_string(), Value::String(language.clone()));

        if path.is_root() {
            self.add_manifests(&mut namespace, local, &language).await?;
        }

        info!("Rendering {}", component);
        self.renderer.render(&template, &namespace).map_err(|e| {
            DiversityError::TemplateError {
                component: component.to_string(),
                reason: format!("{e:#}"),
            }
            .into()
        })
    }

    /// Root-only namespace entries built from everything the render touched.
    async fn add_manifests(&self, namespace: &mut Map<String, Value>, local: &Aggregation, language: &str) -> Result<()> {
        let set = local.resolve();
        let minification = &self.options.minification;

        let modules = aggregation::angular_modules(&set);
        namespace.insert("angularBootstrap".to_string(), Value::String(aggregation::angular_bootstrap(&modules)));
        namespace.insert("angular".to_string(), string_array(modules));

        let scripts = if minification.inline_js {
            let (entries, kept) = bundle::partition(&set, AssetKind::Script, minification.minify_remotes);
            let inline = bundle::concatenate(
                &entries,
                AssetKind::Script,
                minification.minify_js,
                self.loader.as_ref(),
                self.compressor.as_ref(),
            )
            .await;
            namespace.insert("minifiedJs".to_string(), Value::String(escape_script_end(&inline)));
            kept
        } else if minification.minify_js {
            self.bundled(&set, AssetKind::Script).await?
        } else {
            aggregation::collect_urls(&set, Component::script_urls)
        };
        namespace.insert("scripts".to_string(), string_array(scripts));

        let styles = if minification.minify_css {
            self.bundled(&set, AssetKind::Style).await?
        } else {
            aggregation::collect_urls(&set, Component::style_urls)
        };
        namespace.insert("styles".to_string(), string_array(styles));

        let l10n = aggregation::l10n(&set, language, self.loader.as_ref()).await;
        namespace.insert("l10n".to_string(), Value::Array(l10n));
        Ok(())
    }

    /// Assets left unbundled followed by the bundle URL.
    async fn bundled(&self, set: &crate::resolver::ResolvedSet, kind: AssetKind) -> Result<Vec<String>> {
        let minification = &self.options.minification;
        let (entries, mut urls) = bundle::partition(set, kind, minification.minify_remotes);
        if let Some(url) =
            bundle::build(&entries, kind, minification, self.loader.as_ref(), self.compressor.as_ref()).await?
        {
            urls.push(url);
        }
        Ok(urls)
    }

    fn fragment_key(&self, component: &Component, context: &RenderContext, settings: &Value, root: bool) -> String {
        let mut canonical = String::new();
        write_canonical(settings, &mut canonical);
        canonical.push('\n');
        write_canonical(&Value::Object(context.as_map().clone()), &mut canonical);
        let digest = hex::encode(Sha256::digest(canonical.as_bytes()));

        format!(
            "fragment:{}:{}:root={}:validate={}:{}",
            component.identity(),
            component.checksum(),
            root,
            self.options.validate_settings,
            digest
        )
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry.name())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// `value` as JSON, safe to embed in a `<script>` element.
fn script_safe_json(value: &Value) -> String {
    escape_script_end(&value.to_string())
}

fn escape_script_end(text: &str) -> String {
    // Case-insensitive `</script` → `<\/script`
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.to_ascii_lowercase().find("</script") {
        out.push_str(&rest[..idx]);
        out.push_str("<\\/");
        out.push_str(&rest[idx + 2..idx + 8]);
        rest = &rest[idx + 8..];
    }
    out.push_str(rest);
    out
}

fn string_array(items: Vec<String>) -> Value {
    Value::Array(items.into_iter().map(Value::String).collect())
}
