//! Configuration for Diversity.
//!
//! Settings live in a single TOML file that is optional: a missing file yields the
//! defaults.
//!
//! **Location:**
//! - Unix/macOS: `~/.diversity/config.toml`
//! - Windows: `%LOCALAPPDATA%\diversity\config.toml`
//!
//! The location can be overridden with the `DIVERSITY_CONFIG_PATH` environment
//! variable or the CLI's `--config` flag.
//!
//! ```toml
//! [local]
//! base_path = "~/diversity/components"
//! base_url = "http://localhost:8000/components"
//! mode = "default"          # default | verbose | dryrun | nowrite
//! validate_spec = true
//! listing_ttl_secs = 600
//!
//! [remote]
//! url = "https://api.diversity.io/"
//! validate_spec = false
//! ttl_secs = 3600
//!
//! [cache]
//! max_entries = 1024
//! schema_ttl_secs = 3600
//! fragment_ttl_secs = 60
//!
//! [engine]
//! backend_url = "http://localhost:8080/backend/jsonrpc.php"
//! validate_settings = true
//!
//! [minification]
//! base_dir = "~/diversity/minified"
//! base_url = "/minified"
//! minify_js = true
//! minify_css = true
//! minify_remotes = false
//! inline_js = false
//! ```
//!
//! [`DiversityConfig::build_registry`] turns the `[local]` and `[remote]` sections into
//! one [`CompoundRegistry`] (local first); [`DiversityConfig::build_engine`] turns the
//! rest into an [`Engine`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

use crate::constants::{
    CONFIG_PATH_ENV, DEFAULT_CACHE_MAX_ENTRIES, default_fragment_ttl, default_listing_ttl,
    default_remote_ttl, default_schema_ttl,
};
use crate::core::DiversityError;
use crate::engine::{Engine, EngineOptions, MinificationOptions};
use crate::registry::{
    CompoundRegistry, FileMode, LocalRegistry, LocalRegistryOptions, RemoteApiRegistry,
    RemoteRegistryOptions,
};

const fn default_true() -> bool {
    true
}

const fn default_max_entries() -> usize {
    DEFAULT_CACHE_MAX_ENTRIES
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiversityConfig {
    /// Local component tree
    pub local: Option<LocalConfig>,
    /// Diversity API server
    pub remote: Option<RemoteConfig>,
    /// Cache bounds and lifetimes
    pub cache: CacheConfig,
    /// Render engine
    pub engine: EngineConfig,
    /// Script/style bundling
    pub minification: MinificationOptions,
}

/// `[local]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Root of the tree; `~` and environment variables are expanded
    pub base_path: String,
    /// URL the tree is served under
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub mode: FileMode,
    #[serde(default = "default_true")]
    pub validate_spec: bool,
    #[serde(default)]
    pub listing_ttl_secs: Option<u64>,
}

/// `[remote]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// API root
    pub url: String,
    #[serde(default)]
    pub validate_spec: bool,
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

/// `[cache]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Bound applied to every cache instance
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    pub schema_ttl_secs: Option<u64>,
    pub fragment_ttl_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            schema_ttl_secs: None,
            fragment_ttl_secs: None,
        }
    }
}

/// `[engine]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default JSON-RPC backend for component context
    pub backend_url: Option<String>,
    /// Validate settings against settings schemas (never fatal)
    #[serde(default = "default_true")]
    pub validate_settings: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            validate_settings: true,
        }
    }
}

impl DiversityConfig {
    /// Load from the default location, falling back to defaults when no file exists.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` when given, else from the default location. A missing file
    /// yields the defaults.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if fs::try_exists(&path).await.unwrap_or(false) {
            Self::load_from(&path).await
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load from an explicit file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content).map_err(|e| {
            DiversityError::ConfigError {
                message: format!("Failed to parse {}: {e}", path.display()),
            }
            .into()
        })
    }

    /// `$DIVERSITY_CONFIG_PATH`, else the platform default.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("diversity")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".diversity")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Override the local registry's file mode.
    pub fn set_mode(&mut self, mode: FileMode) {
        if let Some(local) = &mut self.local {
            local.mode = mode;
        }
    }

    /// Options for the local registry, when one is configured.
    pub fn local_options(&self) -> Result<Option<LocalRegistryOptions>> {
        let Some(local) = &self.local else {
            return Ok(None);
        };

        let mut options = LocalRegistryOptions::new(expand_path(&local.base_path)?)
            .with_mode(local.mode)
            .with_validation(local.validate_spec)
            .with_listing_ttl(local.listing_ttl_secs.map_or_else(default_listing_ttl, Duration::from_secs));
        if let Some(base_url) = &local.base_url {
            options = options.with_base_url(base_url.clone());
        }
        options.cache_max_entries = self.cache.max_entries;
        Ok(Some(options))
    }

    /// Options for the remote registry, when one is configured.
    pub fn remote_options(&self) -> Option<RemoteRegistryOptions> {
        self.remote.as_ref().map(|remote| {
            let mut options = RemoteRegistryOptions::new(remote.url.clone())
                .with_validation(remote.validate_spec)
                .with_ttl(remote.ttl_secs.map_or_else(default_remote_ttl, Duration::from_secs));
            options.cache_max_entries = self.cache.max_entries;
            options
        })
    }

    /// Options for the engine.
    pub fn engine_options(&self) -> Result<EngineOptions> {
        let mut minification = self.minification.clone();
        minification.base_dir = expand_path(&minification.base_dir.to_string_lossy())?;

        Ok(EngineOptions {
            backend_url: self.engine.backend_url.clone(),
            validate_settings: self.engine.validate_settings,
            minification,
            fragment_ttl: self.cache.fragment_ttl_secs.map_or_else(default_fragment_ttl, Duration::from_secs),
            schema_ttl: self.cache.schema_ttl_secs.map_or_else(default_schema_ttl, Duration::from_secs),
            cache_max_entries: self.cache.max_entries,
        })
    }

    /// The configured local registry.
    pub fn build_local(&self) -> Result<Option<LocalRegistry>> {
        self.local_options()?.map(LocalRegistry::new).transpose()
    }

    /// Connect to the configured remote registry.
    pub async fn build_remote(&self) -> Result<Option<RemoteApiRegistry>> {
        match self.remote_options() {
            Some(options) => Ok(Some(RemoteApiRegistry::connect(options).await?)),
            None => Ok(None),
        }
    }

    /// Every configured registry, local first.
    ///
    /// A remote registry that does not answer is left out with a warning so local
    /// components stay usable.
    ///
    /// # Errors
    ///
    /// [`DiversityError::ConfigError`] when neither section is configured.
    pub async fn build_registry(&self) -> Result<CompoundRegistry> {
        if self.local.is_none() && self.remote.is_none() {
            return Err(DiversityError::ConfigError {
                message: "no registry configured; add a [local] or [remote] section".to_string(),
            }
            .into());
        }

        let mut registry = CompoundRegistry::new();
        if let Some(local) = self.build_local()? {
            registry.add_registry(Arc::new(local), Some("local"));
        }
        match self.build_remote().await {
            Ok(Some(remote)) => registry.add_registry(Arc::new(remote), Some("remote")),
            Ok(None) => {}
            Err(e) if self.local.is_some() => warn!("Skipping remote registry: {:#}", e),
            Err(e) => return Err(e),
        }
        Ok(registry)
    }

    /// An engine over `registry` with the default collaborators.
    pub fn build_engine(&self, registry: Arc<dyn crate::registry::Registry>) -> Result<Engine> {
        Ok(Engine::new(registry, self.engine_options()?))
    }
}

/// Expand `~` and environment variables in a configured path.
fn expand_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path).map_err(|e| DiversityError::ConfigError {
        message: format!("Cannot expand path '{path}': {e}"),
    })?;
    Ok(PathBuf::from(expanded.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_parse_full_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[local]
base_path = "/srv/components"
base_url = "http://localhost/components"
mode = "dryrun"
listing_ttl_secs = 5

[remote]
url = "http://api.example.com"

[cache]
max_entries = 16
fragment_ttl_secs = 1

[engine]
backend_url = "http://backend/rpc"
validate_settings = false

[minification]
base_dir = "/tmp/min"
minify_js = true
"#,
        )
        .unwrap();

        let config = DiversityConfig::load_from(&path).await.unwrap();
        let local = config.local_options().unwrap().unwrap();
        assert_eq!(local.base_path, PathBuf::from("/srv/components"));
        assert_eq!(local.mode, FileMode::DryRun);
        assert!(local.validate);
        assert_eq!(local.listing_ttl, Duration::from_secs(5));
        assert_eq!(local.cache_max_entries, 16);

        let remote = config.remote_options().unwrap();
        assert!(!remote.validate);
        assert_eq!(remote.ttl, default_remote_ttl());

        let engine = config.engine_options().unwrap();
        assert_eq!(engine.backend_url.as_deref(), Some("http://backend/rpc"));
        assert!(!engine.validate_settings);
        assert_eq!(engine.fragment_ttl, Duration::from_secs(1));
        assert_eq!(engine.schema_ttl, default_schema_ttl());
        assert!(engine.minification.minify_js);
        assert!(!engine.minification.minify_css);
        assert_eq!(engine.minification.base_url, "/minified");
        assert_eq!(engine.minification.base_dir, PathBuf::from("/tmp/min"));
    }

    #[tokio::test]
    async fn test_invalid_config_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[local]\nmode = \"loud\"\n").unwrap();

        let err = DiversityConfig::load_from(&path).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<DiversityError>(), Some(DiversityError::ConfigError { .. })));
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = DiversityConfig::load_with_optional(Some(temp.path().join("absent.toml"))).await.unwrap();
        assert_eq!(config, DiversityConfig::default());
        assert!(config.engine.validate_settings);
        assert!(config.local_options().unwrap().is_none());
    }

    #[test]
    #[serial]
    fn test_default_path_env_override() {
        // SAFETY: serialised with every other test touching the environment
        unsafe { std::env::set_var(CONFIG_PATH_ENV, "/etc/diversity.toml") };
        assert_eq!(DiversityConfig::default_path().unwrap(), PathBuf::from("/etc/diversity.toml"));
        unsafe { std::env::remove_var(CONFIG_PATH_ENV) };
        assert!(DiversityConfig::default_path().unwrap().ends_with(".diversity/config.toml"));
    }

    #[test]
    fn test_set_mode_only_touches_local() {
        let mut config = DiversityConfig {
            local: Some(LocalConfig {
                base_path: "/srv".to_string(),
                base_url: None,
                mode: FileMode::Default,
                validate_spec: true,
                listing_ttl_secs: None,
            }),
            ..DiversityConfig::default()
        };
        config.set_mode(FileMode::NoWrite);
        assert_eq!(config.local.unwrap().mode, FileMode::NoWrite);
    }

    #[tokio::test]
    async fn test_build_registry_requires_a_source() {
        let err = DiversityConfig::default().build_registry().await.unwrap_err();
        assert!(err.to_string().contains("no registry configured"));
    }

    #[tokio::test]
    async fn test_unreachable_remote_is_skipped_when_local_exists() {
        let temp = TempDir::new().unwrap();
        let config = DiversityConfig {
            local: Some(LocalConfig {
                base_path: temp.path().to_string_lossy().into_owned(),
                base_url: None,
                mode: FileMode::Default,
                validate_spec: true,
                listing_ttl_secs: None,
            }),
            remote: Some(RemoteConfig {
                url: "not a url".to_string(),
                validate_spec: false,
                ttl_secs: None,
            }),
            ..DiversityConfig::default()
        };
        let registry = config.build_registry().await.unwrap();
        assert_eq!(registry.registry_names(), vec!["local"]);
    }
}
