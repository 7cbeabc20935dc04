//! Error handling for Diversity
//!
//! Library code returns [`anyhow::Result`] and raises the typed [`DiversityError`]
//! variants below whenever callers may want to react to a specific failure. The CLI
//! turns any error chain into an [`ErrorContext`] through [`user_friendly_error`],
//! which adds a colored message, optional details, and an actionable suggestion.
//!
//! # Fatal vs. recovered errors
//!
//! Spec parse failures, dependency resolution failures, missing sub-components, and
//! context resolution failures abort the enclosing render. Settings validation
//! failures, schema/settings shape mismatches, and missing optional assets are logged
//! with `tracing::warn!` and never become a [`DiversityError`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use diversity::core::{DiversityError, user_friendly_error};
//!
//! let err: anyhow::Error = DiversityError::ComponentNotFound {
//!     name: "banner".to_string(),
//!     requirement: "^1.0".to_string(),
//!     path: "/slides/0".to_string(),
//! }
//! .into();
//!
//! let ctx = user_friendly_error(err);
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for Diversity operations.
///
/// Messages identify components by name, version, requirement, and settings path.
/// They never include the on-disk location of a registry, since render errors may
/// be relayed to untrusted callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiversityError {
    /// A version requirement string could not be parsed, even after stripping
    /// non-numeric characters from a caret body.
    #[error("Invalid version requirement: '{requirement}'")]
    InvalidRequirement {
        /// The requirement as written
        requirement: String,
    },

    /// A version string could not be parsed
    #[error("Invalid version: '{version}'")]
    InvalidVersion {
        /// The version as written
        version: String,
    },

    /// A component spec failed validation against the master component schema
    #[error("Invalid component spec for '{component}': {}", .errors.join("; "))]
    InvalidComponentSpec {
        /// Component name (or `<unknown>` when the spec has no usable name)
        component: String,
        /// Human-readable validation errors
        errors: Vec<String>,
    },

    /// A component spec could not be parsed as JSON
    #[error("Failed to parse component spec from {source_name}: {reason}")]
    SpecParseError {
        /// Logical source of the spec (component name or URL)
        source_name: String,
        /// Parser message
        reason: String,
    },

    /// A declared dependency could not be resolved by any registry
    #[error("{requester} depends on {dependency} ({requirement}), which could not be resolved")]
    UnresolvedDependency {
        /// The component declaring the dependency, as `name:version`
        requester: String,
        /// The dependency name
        dependency: String,
        /// The requirement or URL that failed to resolve
        requirement: String,
    },

    /// Dependency expansion revisited a component already on the current chain
    #[error("Circular dependency detected: {chain}")]
    CircularDependency {
        /// The offending chain, e.g. `a:1.0.0 -> b:1.0.0 -> a:1.0.0`
        chain: String,
    },

    /// A settings reference named a component no registry can provide
    #[error("Component '{name}' ({requirement}) not found at settings path {path}")]
    ComponentNotFound {
        /// Component name from the reference
        name: String,
        /// Requirement from the reference (`*` when omitted)
        requirement: String,
        /// Settings path of the reference, e.g. `/slides/0`
        path: String,
    },

    /// A `prerequisite` context entry was absent from the caller context
    #[error("{component} needs '{key}' in context as prerequisite")]
    MissingPrerequisite {
        /// Component as `name:version`
        component: String,
        /// The missing key
        key: String,
    },

    /// A `{{var}}` placeholder in an RPC parameter has no value in the caller context
    #[error("{component} references unknown context variable '{variable}'")]
    UnknownContextVariable {
        /// Component as `name:version`
        component: String,
        /// The placeholder name
        variable: String,
    },

    /// A declared context entry has a `type` no resolver understands
    #[error("{component} has context '{key}' of unhandled type '{kind}'")]
    UnhandledContextType {
        /// Component as `name:version`
        component: String,
        /// The context key
        key: String,
        /// The declared type
        kind: String,
    },

    /// The backend refused or failed a context RPC call
    #[error("Context resolution failed for {component}: {reason}")]
    ContextResolutionFailed {
        /// Component as `name:version`
        component: String,
        /// Failure description
        reason: String,
    },

    /// The cache could not store or compute a value
    #[error("Cache '{namespace}' failed: {reason}")]
    CacheBackendFailure {
        /// Cache namespace
        namespace: String,
        /// Failure description
        reason: String,
    },

    /// A required asset (spec or declared template) could not be loaded
    #[error("Required asset '{path}' of {component} could not be loaded")]
    AssetNotFound {
        /// Component as `name:version`, or `<spec>` for primary spec loads
        component: String,
        /// The asset path as declared
        path: String,
    },

    /// A registry failed its liveness probe or cannot be reached
    #[error("Registry '{registry}' is unavailable: {reason}")]
    RegistryUnavailable {
        /// Registry name or URL
        registry: String,
        /// Failure description
        reason: String,
    },

    /// An HTTP request failed
    #[error("Network error while requesting {url}: {reason}")]
    NetworkError {
        /// Requested URL
        url: String,
        /// Failure description
        reason: String,
    },

    /// The template renderer rejected a template
    #[error("Template rendering failed for {component}: {reason}")]
    TemplateError {
        /// Component as `name:version`
        component: String,
        /// Renderer message
        reason: String,
    },

    /// Configuration file problems
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Failure description
        message: String,
    },

    /// A file operation failed during install or uninstall
    #[error("File system error during {operation}: {path}")]
    FileSystemError {
        /// Operation name (copy, remove, mkdir, write)
        operation: String,
        /// Path relative to the registry root
        path: String,
    },
}

/// Error wrapper with user-facing details and a suggestion.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: DiversityError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: DiversityError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: message in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Convert any error into an [`ErrorContext`] with a suggestion.
///
/// The whole chain is searched for a [`DiversityError`] so that context added with
/// `anyhow::Context` does not hide the typed cause.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(diversity_error) = error.chain().find_map(|e| e.downcast_ref::<DiversityError>()) {
        let mut ctx = create_error_context(diversity_error.clone());
        let outer = error.to_string();
        if outer != diversity_error.to_string() {
            let details = match ctx.details.take() {
                Some(existing) => format!("{outer}\n{existing}"),
                None => outer,
            };
            ctx = ctx.with_details(details);
        }
        return ctx;
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(DiversityError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of your Diversity config file");
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::PermissionDenied {
            return ErrorContext::new(DiversityError::FileSystemError {
                operation: "file access".to_string(),
                path: "unknown".to_string(),
            })
            .with_suggestion("Check the permissions of the registry directory");
        }
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(DiversityError::ConfigError {
        message,
    })
}

fn create_error_context(error: DiversityError) -> ErrorContext {
    match &error {
        DiversityError::InvalidRequirement {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Use '*', an exact version like '1.2.3', a caret range like '^1.2', \
             or comparators like '>=1.0, <2.0'",
        ),
        DiversityError::InvalidComponentSpec {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Fix the listed fields in diversity.json or disable spec validation"),
        DiversityError::UnresolvedDependency {
            dependency,
            ..
        } => {
            let suggestion = format!(
                "Install a version of '{dependency}' that satisfies the requirement, \
                 or relax the requirement in diversity.json"
            );
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        DiversityError::CircularDependency {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Remove one of the dependencies in the chain to break the cycle"),
        DiversityError::ComponentNotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the component name and version in the settings document")
            .with_details("Use 'diversity list' to see the components known to the registry"),
        DiversityError::MissingPrerequisite {
            key,
            ..
        } => {
            let suggestion = format!("Pass '{key}' in the render context");
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        DiversityError::UnknownContextVariable {
            variable,
            ..
        } => {
            let suggestion = format!("Pass '{variable}' in the render context");
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        DiversityError::RegistryUnavailable {
            ..
        }
        | DiversityError::NetworkError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the registry URL in your config and your network connection"),
        DiversityError::ConfigError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check ~/.diversity/config.toml or the file passed with --config"),
        _ => ErrorContext::new(error),
    }
}
