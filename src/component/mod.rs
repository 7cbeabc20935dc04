//! Components: the immutable value objects every other module works with.
//!
//! A [`Component`] is built once from a raw `diversity.json` document plus the load
//! options of the registry that found it. Construction optionally validates the spec
//! against the [master schema](schema::master_schema), computes a content checksum,
//! fills in defaults for every optional key, and classifies each dependency as either
//! a version range or a direct URL reference.
//!
//! Two components are the same entity when name and version are equal. Sorting puts
//! names in ascending order and, within a name, newer versions first.
//!
//! # Example
//!
//! ```rust
//! use diversity::component::{Component, ComponentOptions};
//! use serde_json::json;
//!
//! let component = Component::from_spec(
//!     json!({
//!         "name": "dummy",
//!         "version": "0.0.1",
//!         "script": ["js/dummy1.js", "//cdn.example.com/lib.js"]
//!     }),
//!     ComponentOptions::default().with_base_url("http://localhost/components/dummy/0.0.1"),
//! )?;
//!
//! assert_eq!(component.to_string(), "dummy:0.0.1");
//! assert_eq!(
//!     component.script_urls(),
//!     vec![
//!         "http://localhost/components/dummy/0.0.1/js/dummy1.js".to_string(),
//!         "//cdn.example.com/lib.js".to_string(),
//!     ]
//! );
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod schema;

use anyhow::{Context, Result};
use semver::Version;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use crate::core::DiversityError;
use crate::schema::collect_errors;
use crate::utils::paths::{is_remote, join_location};
use crate::version::{VersionRequirement, parse_version};

/// Load-time options supplied by the registry that found a spec.
#[derive(Debug, Clone, Default)]
pub struct ComponentOptions {
    /// URL under which the component's assets are served
    pub base_url: Option<String>,
    /// Directory holding the component's files, when it lives on disk
    pub base_path: Option<PathBuf>,
    /// Validate the spec against the master schema
    pub validate: bool,
}

impl ComponentOptions {
    /// Set the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the base path.
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    /// Enable or disable master schema validation.
    #[must_use]
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }
}

/// How a dependency selects its component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Resolve through the registry by name and version range
    Range(VersionRequirement),
    /// Load the spec found at this URL
    Direct(String),
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range(req) => write!(f, "{req}"),
            Self::Direct(url) => f.write_str(url),
        }
    }
}

/// A declared dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Component name
    pub name: String,
    /// Range or URL
    pub requirement: Requirement,
}

/// An immutable, versioned component.
#[derive(Debug, Clone)]
pub struct Component {
    name: String,
    version: Version,
    checksum: String,
    dependencies: Vec<Dependency>,
    settings_schema: Value,
    settings_schema_source: Option<String>,
    templates: Vec<String>,
    styles: Vec<String>,
    scripts: Vec<String>,
    themes: Vec<String>,
    assets: Vec<String>,
    angular_module: Option<String>,
    locales: BTreeMap<String, String>,
    context: Map<String, Value>,
    fields: Map<String, Value>,
    partials: Map<String, Value>,
    kind: Option<String>,
    pagetype: Option<String>,
    title: Option<String>,
    description: Option<String>,
    thumbnail: Option<String>,
    price: Option<Value>,
    base_url: Option<String>,
    base_path: Option<PathBuf>,
    raw: Value,
}

impl Component {
    /// Build a component from spec text.
    ///
    /// `source_name` only appears in error messages.
    pub fn from_json_str(text: &str, source_name: &str, options: ComponentOptions) -> Result<Self> {
        let raw: Value = serde_json::from_str(text).map_err(|e| DiversityError::SpecParseError {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_spec(raw, options)
    }

    /// Build a component from a parsed spec document.
    ///
    /// # Errors
    ///
    /// - [`DiversityError::InvalidComponentSpec`] when validation is requested and fails,
    ///   or when `name`/`version` are unusable
    /// - [`DiversityError::InvalidRequirement`] when a dependency range does not parse
    pub fn from_spec(raw: Value, options: ComponentOptions) -> Result<Self> {
        let display_name =
            raw.get("name").and_then(Value::as_str).unwrap_or("<unknown>").to_string();

        let Some(spec) = raw.as_object() else {
            return Err(DiversityError::InvalidComponentSpec {
                component: display_name,
                errors: vec!["/: spec must be a JSON object".to_string()],
            }
            .into());
        };

        if options.validate {
            let errors = collect_errors(schema::master_schema(), &raw);
            if !errors.is_empty() {
                return Err(DiversityError::InvalidComponentSpec {
                    component: display_name,
                    errors,
                }
                .into());
            }
        }

        let name = match spec.get("name").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return Err(DiversityError::InvalidComponentSpec {
                    component: display_name,
                    errors: vec!["/name: a non-empty string is required".to_string()],
                }
                .into());
            }
        };

        let version_text = spec.get("version").and_then(Value::as_str).unwrap_or_default();
        let version = parse_version(version_text).map_err(|_| DiversityError::InvalidComponentSpec {
            component: name.clone(),
            errors: vec![format!("/version: '{version_text}' is not a version")],
        })?;

        let dependencies = parse_dependencies(spec.get("dependencies"))
            .with_context(|| format!("Invalid dependencies in {name}:{version}"))?;

        let (settings_schema, settings_schema_source) = match spec.get("settings") {
            Some(Value::Object(schema)) => (Value::Object(schema.clone()), None),
            Some(Value::String(source)) => (Value::Object(Map::new()), Some(source.clone())),
            _ => (Value::Object(Map::new()), None),
        };

        let angular_module = match spec.get("angular") {
            Some(Value::Bool(true)) => Some(name.clone()),
            Some(Value::String(module)) if !module.is_empty() => Some(module.clone()),
            _ => None,
        };

        let checksum = checksum(&raw);

        Ok(Self {
            dependencies,
            settings_schema,
            settings_schema_source,
            angular_module,
            checksum,
            templates: path_list(spec.get("template")),
            styles: path_list(spec.get("style")),
            scripts: path_list(spec.get("script")),
            themes: path_list(spec.get("themes")),
            assets: path_list(spec.get("assets")),
            locales: parse_locales(&name, spec.get("i18n")),
            context: object(spec.get("context")),
            fields: object(spec.get("fields")),
            partials: object(spec.get("partials")),
            kind: string(spec.get("type")),
            pagetype: string(spec.get("pagetype")),
            title: string(spec.get("title")),
            description: string(spec.get("description")),
            thumbnail: string(spec.get("thumbnail")),
            price: spec.get("price").cloned(),
            base_url: options.base_url.map(|u| u.trim_end_matches('/').to_string()),
            base_path: options.base_path,
            name,
            version,
            raw,
        })
    }

    /// Component name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Component version.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// `name:version`, used in logs and error messages.
    pub fn identity(&self) -> String {
        format!("{}:{}", self.name, self.version)
    }

    /// `sha256:<hex>` over the canonical (key-sorted) spec.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Declared dependencies in declaration order.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Inline settings schema; an empty object when the schema is external or absent.
    pub fn settings_schema(&self) -> &Value {
        &self.settings_schema
    }

    /// Path of an external settings schema, relative to the component's base location.
    pub fn settings_schema_source(&self) -> Option<&str> {
        self.settings_schema_source.as_deref()
    }

    /// Declared template paths.
    pub fn templates(&self) -> &[String] {
        &self.templates
    }

    /// Declared stylesheet paths.
    pub fn styles(&self) -> &[String] {
        &self.styles
    }

    /// Declared script paths.
    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    /// Declared theme paths.
    pub fn themes(&self) -> &[String] {
        &self.themes
    }

    /// Declared additional asset paths.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Angular module name, if the component provides one.
    pub fn angular_module(&self) -> Option<&str> {
        self.angular_module.as_deref()
    }

    /// Locale → translation resource path.
    pub fn locales(&self) -> &BTreeMap<String, String> {
        &self.locales
    }

    /// Declared context entries, resolved per render by a
    /// [`ContextResolver`](crate::context::ContextResolver).
    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    /// Declared editor fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Declared partials.
    pub fn partials(&self) -> &Map<String, Value> {
        &self.partials
    }

    /// The spec's `type`.
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    /// The spec's `pagetype`.
    pub fn pagetype(&self) -> Option<&str> {
        self.pagetype.as_deref()
    }

    /// Human title.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Human description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Thumbnail path.
    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref()
    }

    /// Price as declared.
    pub fn price(&self) -> Option<&Value> {
        self.price.as_ref()
    }

    /// URL the component's assets are served from.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Directory the component was loaded from.
    pub fn base_path(&self) -> Option<&std::path::Path> {
        self.base_path.as_deref()
    }

    /// The spec exactly as loaded.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Pretty-printed spec.
    pub fn dump(&self) -> String {
        serde_json::to_string_pretty(&self.raw).unwrap_or_default()
    }

    /// Where to load `path` from: remote paths unchanged, relative paths against the
    /// base path when known, else against the base URL.
    pub fn asset_location(&self, path: &str) -> String {
        if is_remote(path) {
            return path.to_string();
        }
        if let Some(base_path) = &self.base_path {
            return base_path.join(path).to_string_lossy().into_owned();
        }
        match &self.base_url {
            Some(base_url) => join_location(base_url, path),
            None => path.to_string(),
        }
    }

    /// Public URL of `path`: remote paths unchanged, relative paths against the base
    /// URL (or the base path when the component has no URL).
    pub fn public_location(&self, path: &str) -> String {
        if is_remote(path) {
            return path.to_string();
        }
        match (&self.base_url, &self.base_path) {
            (Some(base_url), _) => join_location(base_url, path),
            (None, Some(base_path)) => base_path.join(path).to_string_lossy().into_owned(),
            (None, None) => path.to_string(),
        }
    }

    /// Public script URLs in declaration order.
    pub fn script_urls(&self) -> Vec<String> {
        self.scripts.iter().map(|s| self.public_location(s)).collect()
    }

    /// Public stylesheet URLs in declaration order.
    pub fn style_urls(&self) -> Vec<String> {
        self.styles.iter().map(|s| self.public_location(s)).collect()
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.version == other.version
    }
}

impl Eq for Component {}

impl Hash for Component {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.version.hash(state);
    }
}

impl Ord for Component {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name).then_with(|| other.version.cmp(&self.version))
    }
}

impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn parse_dependencies(value: Option<&Value>) -> Result<Vec<Dependency>> {
    let Some(Value::Object(map)) = value else {
        return Ok(Vec::new());
    };

    map.iter()
        .map(|(name, req)| {
            let text = match req {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let requirement = if is_remote(&text) {
                Requirement::Direct(text)
            } else {
                Requirement::Range(VersionRequirement::parse(&text)?)
            };
            Ok(Dependency {
                name: name.clone(),
                requirement,
            })
        })
        .collect()
}

fn parse_locales(component: &str, value: Option<&Value>) -> BTreeMap<String, String> {
    let Some(Value::Object(map)) = value else {
        return BTreeMap::new();
    };

    map.iter()
        .filter_map(|(lang, entry)| {
            let path = match entry {
                Value::String(path) => Some(path.clone()),
                Value::Object(obj) => obj.get("view").and_then(Value::as_str).map(str::to_string),
                _ => None,
            };
            if path.is_none() {
                tracing::warn!("{component} has an unusable i18n entry for '{lang}'");
            }
            path.map(|p| (lang.clone(), p))
        })
        .collect()
}

fn path_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => {
            items.iter().filter_map(Value::as_str).map(str::to_string).collect()
        }
        _ => Vec::new(),
    }
}

fn object(value: Option<&Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

fn string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

fn checksum(raw: &Value) -> String {
    let mut canonical = String::new();
    write_canonical(raw, &mut canonical);
    format!("sha256:{}", hex::encode(Sha256::digest(canonical.as_bytes())))
}

/// Serialize with object keys sorted at every level.
pub(crate) fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
