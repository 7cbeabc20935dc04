//! Filesystem-backed registry.
//!
//! Layout under the base path:
//!
//! ```text
//! <base>/<name>/<version>/diversity.json   installed version
//! <base>/<name>/diversity.json             development checkout (version ignored)
//! ```
//!
//! The name → versions index is built by globbing the tree and cached for
//! `listing_ttl`, so on-disk changes made by other processes show up periodically.
//! Installs and uninstalls made through this registry invalidate it immediately.

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use reqwest::Client;
use semver::Version;
use std::collections::BTreeMap;
use std::path::{Component as PathComponent, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::file_ops::{FileMode, FileOps};
use super::{Listing, Registry, fetch_direct, parent_url, select_version};
use crate::assets::http::{build_client, fetch_bytes, fetch_text};
use crate::cache::Cache;
use crate::component::{Component, ComponentOptions};
use crate::constants::{DEFAULT_CACHE_MAX_ENTRIES, LOCAL_SPEC_GLOB, SPEC_FILE_NAME, default_listing_ttl};
use crate::core::DiversityError;
use crate::utils::paths::{is_remote, join_location};
use crate::version::{VersionRequirement, parse_version, sort_descending};

/// Options for [`LocalRegistry`].
#[derive(Debug, Clone)]
pub struct LocalRegistryOptions {
    /// Root of the component tree
    pub base_path: PathBuf,
    /// URL under which the tree is served; components get `<base_url>/<name>/<version>`
    pub base_url: Option<String>,
    /// How install/uninstall touch the filesystem
    pub mode: FileMode,
    /// Validate specs against the master schema when loading
    pub validate: bool,
    /// How long the version index is trusted
    pub listing_ttl: Duration,
    /// Bound for the index and component caches
    pub cache_max_entries: usize,
}

impl LocalRegistryOptions {
    /// Defaults for a tree rooted at `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            base_url: None,
            mode: FileMode::Default,
            validate: true,
            listing_ttl: default_listing_ttl(),
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }

    /// Set the public base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the file mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: FileMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable or disable spec validation.
    #[must_use]
    pub const fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Set the index TTL.
    #[must_use]
    pub const fn with_listing_ttl(mut self, ttl: Duration) -> Self {
        self.listing_ttl = ttl;
        self
    }
}

#[derive(Debug, Clone)]
struct Installed {
    version: Version,
    /// Version directory name; `None` for a development checkout
    dir: Option<String>,
}

#[derive(Debug, Default)]
struct LocalIndex {
    installed: BTreeMap<String, Vec<Installed>>,
}

impl LocalIndex {
    fn listing(&self) -> Listing {
        self.installed
            .iter()
            .map(|(name, entries)| {
                let mut versions: Vec<Version> = entries.iter().map(|e| e.version.clone()).collect();
                versions.dedup();
                (name.clone(), versions)
            })
            .collect()
    }
}

/// A planned filesystem operation, executed through the registry's [`FileOps`].
#[derive(Debug)]
enum FileOp {
    CreateDir(PathBuf),
    Copy(PathBuf, PathBuf),
    Write(PathBuf, Vec<u8>),
    Remove(PathBuf),
}

/// Where an install reads its files from.
enum InstallSource {
    Dir(PathBuf),
    Url(String),
}

/// Registry over a directory tree of installed components.
pub struct LocalRegistry {
    name: String,
    options: LocalRegistryOptions,
    index: Cache<Arc<LocalIndex>>,
    components: Cache<Arc<Component>>,
    fallback: Option<Arc<dyn Registry>>,
    file_ops: Arc<dyn FileOps>,
    client: Client,
}

impl LocalRegistry {
    /// Open the tree at `options.base_path`, creating it when the mode performs I/O.
    pub fn new(options: LocalRegistryOptions) -> Result<Self> {
        let file_ops = options.mode.file_ops();
        if !options.base_path.exists() && file_ops.performs_io() {
            file_ops.create_dir_all(&options.base_path)?;
        }

        Ok(Self {
            name: "local".to_string(),
            index: Cache::new("local-index", 4),
            components: Cache::new("local-components", options.cache_max_entries),
            fallback: None,
            file_ops,
            client: build_client(),
            options,
        })
    }

    /// Ask `fallback` for components this tree does not have.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn Registry>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Rename the registry (used in logs and compound registries).
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Root of the tree.
    pub fn base_path(&self) -> &Path {
        &self.options.base_path
    }

    /// Current file mode.
    pub const fn mode(&self) -> FileMode {
        self.options.mode
    }

    async fn index(&self) -> Result<Arc<LocalIndex>> {
        let base = self.options.base_path.clone();
        self.index
            .get_or_compute("installed", self.options.listing_ttl, move || async move {
                let index = tokio::task::spawn_blocking(move || scan(&base))
                    .await
                    .context("Local registry scan panicked")??;
                Ok(Arc::new(index))
            })
            .await
    }

    fn invalidate(&self) {
        self.index.invalidate_all();
        self.components.invalidate_all();
    }

    async fn from_fallback(
        &self,
        name: &str,
        requirement: Option<&VersionRequirement>,
    ) -> Result<Option<Arc<Component>>> {
        match &self.fallback {
            Some(fallback) => {
                debug!("'{}' not installed locally, asking {}", name, fallback.name());
                fallback.get_component(name, requirement).await
            }
            None => Ok(None),
        }
    }

    async fn load_installed(&self, name: &str, entry: &Installed) -> Result<Option<Arc<Component>>> {
        let (dir, base_url, label) = match &entry.dir {
            Some(version_dir) => (
                self.options.base_path.join(name).join(version_dir),
                self.options.base_url.as_ref().map(|url| format!("{}/{name}/{version_dir}", url.trim_end_matches('/'))),
                format!("{name}/{version_dir}"),
            ),
            None => (
                self.options.base_path.join(name),
                self.options.base_url.as_ref().map(|url| format!("{}/{name}", url.trim_end_matches('/'))),
                name.to_string(),
            ),
        };

        let key = format!("component:{label}:validate={}", self.options.validate);
        let spec_path = dir.join(SPEC_FILE_NAME);
        let validate = self.options.validate;

        let result = self
            .components
            .get_or_compute(&key, self.options.listing_ttl, || async move {
                let text = tokio::fs::read_to_string(&spec_path).await.map_err(|e| {
                    // Keep the tree layout out of user-facing errors.
                    anyhow::Error::from(e).context(DiversityError::FileSystemError {
                        operation: "read spec".to_string(),
                        path: format!("{label}/{SPEC_FILE_NAME}"),
                    })
                })?;

                let mut options = ComponentOptions::default().with_base_path(&dir).with_validation(validate);
                options.base_url = base_url;
                let component = Component::from_json_str(&text, &format!("{label}/{SPEC_FILE_NAME}"), options)?;
                Ok(Arc::new(component))
            })
            .await;

        match result {
            Ok(component) => Ok(Some(component)),
            Err(e) if is_not_found(&e) => {
                // Removed since the index was built.
                self.index.invalidate_all();
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Install a component from a spec path, a component directory, or a spec URL.
    ///
    /// The spec and every relative file it declares are copied to
    /// `<base>/<name>/<version>/`. An already-installed name and version is returned
    /// unchanged unless `force` is set. Missing optional files are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Fails when the spec cannot be loaded or is invalid, when a declared path leaves
    /// the component directory, or when a file operation fails.
    pub async fn install(&self, source: &str, force: bool) -> Result<Arc<Component>> {
        let (text, origin) = self.read_install_source(source).await?;

        let parsed = Component::from_json_str(&text, source, ComponentOptions::default().with_validation(self.options.validate))?;
        let name = parsed.name().to_string();
        let version_dir = parsed.version().to_string();
        ensure_plain_segment(&name, "component name")?;

        let target = self.options.base_path.join(&name).join(&version_dir);
        if !force && target.join(SPEC_FILE_NAME).exists() {
            info!("{} is already installed", parsed);
            let entry = Installed {
                version: parsed.version().clone(),
                dir: Some(version_dir),
            };
            return self
                .load_installed(&name, &entry)
                .await?
                .ok_or_else(|| anyhow::anyhow!("{parsed} disappeared during install"));
        }

        let mut plan = Vec::new();
        if force {
            plan.push(FileOp::Remove(target.clone()));
        }
        plan.push(FileOp::CreateDir(target.clone()));
        plan.push(FileOp::Write(target.join(SPEC_FILE_NAME), text.clone().into_bytes()));

        for relative in installable_paths(&parsed) {
            let safe = safe_relative_path(&relative).ok_or_else(|| DiversityError::InvalidComponentSpec {
                component: name.clone(),
                errors: vec![format!("path '{relative}' leaves the component directory")],
            })?;
            let destination = target.join(&safe);
            let parent = destination.parent().map(Path::to_path_buf);

            let op = match &origin {
                InstallSource::Dir(dir) => {
                    let from = dir.join(&safe);
                    if !from.is_file() {
                        warn!("Skipping missing file '{}' of {}", relative, parsed);
                        continue;
                    }
                    FileOp::Copy(from, destination)
                }
                InstallSource::Url(base) => match fetch_bytes(&self.client, &join_location(base, &relative)).await? {
                    Some(bytes) => FileOp::Write(destination, bytes),
                    None => {
                        warn!("Skipping missing file '{}' of {}", relative, parsed);
                        continue;
                    }
                },
            };
            if let Some(parent) = parent {
                plan.push(FileOp::CreateDir(parent));
            }
            plan.push(op);
        }

        self.apply(plan).await?;
        info!("Installed {}", parsed);

        let mut options = ComponentOptions::default().with_base_path(&target).with_validation(self.options.validate);
        options.base_url = self
            .options
            .base_url
            .as_ref()
            .map(|url| format!("{}/{name}/{version_dir}", url.trim_end_matches('/')));
        Ok(Arc::new(Component::from_json_str(&text, source, options)?))
    }

    /// Remove every installed version of `name` matching `requirement` (all versions
    /// when `None`), returning the removed versions newest first.
    pub async fn uninstall(&self, name: &str, requirement: Option<&VersionRequirement>) -> Result<Vec<Version>> {
        ensure_plain_segment(name, "component name")?;
        let index = self.index().await?;
        let Some(entries) = index.installed.get(name) else {
            return Ok(Vec::new());
        };

        let mut removed = Vec::new();
        let mut plan = Vec::new();
        for entry in entries {
            let Some(dir) = &entry.dir else {
                debug!("Leaving development checkout of '{}' in place", name);
                continue;
            };
            if requirement.is_none_or(|req| req.satisfied_by(&entry.version)) {
                plan.push(FileOp::Remove(self.options.base_path.join(name).join(dir)));
                removed.push(entry.version.clone());
            }
        }

        let remaining = entries.len() - removed.len();
        if remaining == 0 && !removed.is_empty() {
            plan.push(FileOp::Remove(self.options.base_path.join(name)));
        }

        self.apply(plan).await?;
        sort_descending(&mut removed);
        for version in &removed {
            info!("Uninstalled {}:{}", name, version);
        }
        Ok(removed)
    }

    async fn read_install_source(&self, source: &str) -> Result<(String, InstallSource)> {
        if is_remote(source) {
            let text = fetch_text(&self.client, source).await?.ok_or_else(|| DiversityError::NetworkError {
                url: source.to_string(),
                reason: "no spec found at this URL".to_string(),
            })?;
            return Ok((text, InstallSource::Url(parent_url(source))));
        }

        let expanded = shellexpand::tilde(source).into_owned();
        let mut spec_path = PathBuf::from(expanded);
        if spec_path.is_dir() {
            spec_path = spec_path.join(SPEC_FILE_NAME);
        }
        let text = tokio::fs::read_to_string(&spec_path)
            .await
            .with_context(|| format!("Failed to read spec: {}", spec_path.display()))?;
        let dir = spec_path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Ok((text, InstallSource::Dir(dir)))
    }

    async fn apply(&self, plan: Vec<FileOp>) -> Result<()> {
        if plan.is_empty() {
            return Ok(());
        }
        let ops = Arc::clone(&self.file_ops);
        tokio::task::spawn_blocking(move || {
            for op in &plan {
                match op {
                    FileOp::CreateDir(path) => ops.create_dir_all(path)?,
                    FileOp::Copy(from, to) => ops.copy(from, to)?,
                    FileOp::Write(path, bytes) => ops.write(path, bytes)?,
                    FileOp::Remove(path) => ops.remove_dir_all(path)?,
                }
            }
            anyhow::Ok(())
        })
        .await
        .context("File operation task panicked")??;

        if self.file_ops.performs_io() {
            self.invalidate();
        }
        Ok(())
    }
}

impl Registry for LocalRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_component<'a>(
        &'a self,
        name: &'a str,
        requirement: Option<&'a VersionRequirement>,
    ) -> BoxFuture<'a, Result<Option<Arc<Component>>>> {
        Box::pin(async move {
            if ensure_plain_segment(name, "component name").is_err() {
                return self.from_fallback(name, requirement).await;
            }

            let index = self.index().await?;
            let Some(entries) = index.installed.get(name) else {
                return self.from_fallback(name, requirement).await;
            };

            // A development checkout wins regardless of the requirement.
            let chosen = match entries.iter().find(|e| e.dir.is_none()) {
                Some(dev) => Some(dev.clone()),
                None => {
                    let versions: Vec<Version> = entries.iter().map(|e| e.version.clone()).collect();
                    select_version(&versions, requirement)
                        .and_then(|v| entries.iter().find(|e| e.version == v).cloned())
                }
            };

            let Some(entry) = chosen else {
                return self.from_fallback(name, requirement).await;
            };

            match self.load_installed(name, &entry).await? {
                Some(component) => Ok(Some(component)),
                None => self.from_fallback(name, requirement).await,
            }
        })
    }

    fn list_versions<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<Version>>> {
        Box::pin(async move {
            let index = self.index().await?;
            Ok(index.listing().remove(name).unwrap_or_default())
        })
    }

    fn list_components(&self) -> BoxFuture<'_, Result<Listing>> {
        Box::pin(async move { Ok(self.index().await?.listing()) })
    }

    fn load_direct<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Option<Arc<Component>>>> {
        Box::pin(async move {
            let key = format!("direct:{url}:validate={}", self.options.validate);
            if let Some(component) = self.components.get(&key) {
                return Ok(Some(component));
            }
            let component = fetch_direct(&self.client, url, self.options.validate).await?;
            if let Some(component) = &component {
                self.components.insert(key, Arc::clone(component), self.options.listing_ttl);
            }
            Ok(component)
        })
    }
}

impl std::fmt::Debug for LocalRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalRegistry")
            .field("name", &self.name)
            .field("base_path", &self.options.base_path)
            .field("mode", &self.options.mode)
            .field("has_fallback", &self.fallback.is_some())
            .finish_non_exhaustive()
    }
}

/// Build the index by globbing installed specs and development checkouts.
fn scan(base: &Path) -> Result<LocalIndex> {
    let mut index = LocalIndex::default();
    if !base.is_dir() {
        return Ok(index);
    }

    let escaped = glob::Pattern::escape(&base.to_string_lossy());
    let installed = format!("{escaped}/{LOCAL_SPEC_GLOB}");
    for path in glob::glob(&installed).context("Invalid local registry glob")?.flatten() {
        let Some(version_dir) = path.parent() else { continue };
        let (Some(name), Some(dir)) = (
            version_dir.parent().and_then(Path::file_name).and_then(|n| n.to_str()),
            version_dir.file_name().and_then(|n| n.to_str()),
        ) else {
            continue;
        };
        match parse_version(dir) {
            Ok(version) => index.installed.entry(name.to_string()).or_default().push(Installed {
                version,
                dir: Some(dir.to_string()),
            }),
            Err(_) => warn!("Ignoring '{}/{}': not a version directory", name, dir),
        }
    }

    let dev = format!("{escaped}/*/{SPEC_FILE_NAME}");
    for path in glob::glob(&dev).context("Invalid local registry glob")?.flatten() {
        let Some(name) = path.parent().and_then(Path::file_name).and_then(|n| n.to_str()) else {
            continue;
        };
        match dev_version(&path) {
            Some(version) => index.installed.entry(name.to_string()).or_default().push(Installed {
                version,
                dir: None,
            }),
            None => warn!("Ignoring development checkout '{}': unreadable version", name),
        }
    }

    for entries in index.installed.values_mut() {
        entries.sort_by(|a, b| b.version.cmp(&a.version));
    }
    debug!("Indexed {} local component(s)", index.installed.len());
    Ok(index)
}

fn dev_version(spec_path: &Path) -> Option<Version> {
    let text = std::fs::read_to_string(spec_path).ok()?;
    let raw: serde_json::Value = serde_json::from_str(&text).ok()?;
    parse_version(raw.get("version")?.as_str()?).ok()
}

/// Relative files an install copies next to the spec.
fn installable_paths(component: &Component) -> Vec<String> {
    let mut paths: Vec<String> = component
        .templates()
        .iter()
        .chain(component.styles())
        .chain(component.scripts())
        .chain(component.themes())
        .chain(component.assets())
        .cloned()
        .collect();
    paths.extend(component.thumbnail().map(str::to_string));
    paths.extend(component.settings_schema_source().map(str::to_string));
    paths.extend(component.locales().values().cloned());

    let mut seen = std::collections::HashSet::new();
    paths.retain(|p| !is_remote(p) && seen.insert(p.clone()));
    paths
}

/// `path` as a relative path that stays inside its root, or `None`.
fn safe_relative_path(path: &str) -> Option<PathBuf> {
    let candidate = Path::new(path);
    let mut clean = PathBuf::new();
    for part in candidate.components() {
        match part {
            PathComponent::Normal(segment) => clean.push(segment),
            PathComponent::CurDir => {}
            _ => return None,
        }
    }
    (!clean.as_os_str().is_empty()).then_some(clean)
}

fn ensure_plain_segment(value: &str, what: &str) -> Result<()> {
    let plain = !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\'])
        && !value.contains('\0');
    if plain {
        Ok(())
    } else {
        Err(DiversityError::ConfigError {
            message: format!("invalid {what} '{value}'"),
        }
        .into())
    }
}

fn is_not_found(error: &anyhow::Error) -> bool {
    error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<std::io::Error>())
        .any(|io| io.kind() == std::io::ErrorKind::NotFound)
}
