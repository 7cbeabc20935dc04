//! Global constants used throughout the Diversity codebase.
//!
//! Timeouts, cache bounds, file names, and reserved keys that more than one
//! module depends on.

use std::time::Duration;

/// File name of a component spec inside its version directory.
pub const SPEC_FILE_NAME: &str = "diversity.json";

/// Glob (relative to a local registry root) matching installed component specs.
pub const LOCAL_SPEC_GLOB: &str = "*/*/diversity.json";

/// How long a local registry trusts its name→versions listing (600 seconds).
pub fn default_listing_ttl() -> Duration {
    Duration::from_secs(600)
}

/// How long a remote registry reuses an HTTP response (3600 seconds).
pub fn default_remote_ttl() -> Duration {
    Duration::from_secs(3600)
}

/// How long a loaded settings schema stays cached (3600 seconds).
pub fn default_schema_ttl() -> Duration {
    Duration::from_secs(3600)
}

/// How long a rendered fragment stays cached (60 seconds).
pub fn default_fragment_ttl() -> Duration {
    Duration::from_secs(60)
}

/// Default upper bound on entries per cache instance.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1024;

/// Timeout for a single HTTP request against a registry or asset host (30 seconds).
pub fn http_request_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Maximum attempts for an HTTP request before giving up.
pub const HTTP_MAX_ATTEMPTS: usize = 3;

/// Body the Diversity API root returns when it is alive.
pub const API_WELCOME_SENTINEL: &str = "Welcome to Diversity Api";

/// Schema `format` value marking a nested component reference.
pub const DIVERSITY_FORMAT: &str = "diversity";

/// Key under which pre-rendered markup replaces a component reference.
pub const COMPONENT_HTML_KEY: &str = "componentHTML";

/// Reserved render context key holding the backend URL.
pub const CONTEXT_BACKEND_URL: &str = "backendURL";

/// Reserved render context key holding the active language.
pub const CONTEXT_LANGUAGE: &str = "language";

/// Language used by the `lang` template filter when the context has none.
pub const DEFAULT_LANGUAGE: &str = "sv";

/// Currency substituted by the `currency` template filter.
pub const DEFAULT_CURRENCY: &str = "SEK";

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "DIVERSITY_CONFIG_PATH";

/// How long a caller waits for another task filling the same cache key (120 seconds).
pub fn cache_fill_timeout() -> Duration {
    Duration::from_secs(120)
}
