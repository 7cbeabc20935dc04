//! Test utilities for Diversity
//!
//! Helpers for writing tests against real on-disk registries:
//! - Logging initialization that is safe to call from every test
//! - [`RegistryFixture`]: a temporary local registry tree with helpers to add components
//! - [`fixtures`]: the standard component set used across unit and integration tests
//!
//! # Example
//!
//! ```rust,no_run
//! use diversity::registry::Registry;
//! use diversity::test_utils::RegistryFixture;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let fixture = RegistryFixture::standard()?;
//! let registry = fixture.registry()?;
//! assert!(registry.get_component("dummy", None).await?.is_some());
//! # Ok(())
//! # }
//! ```

pub mod fixtures;

pub use fixtures::RegistryFixture;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise `RUST_LOG`
/// when set; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=diversity=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
