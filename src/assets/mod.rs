//! Asset loading and compression.
//!
//! Assets are templates, scripts, stylesheets, translation files, and external
//! settings schemas. [`AssetLoader`] resolves both filesystem paths and URLs through
//! one call; a missing asset is `None`, and each caller decides whether that is fatal.
//! [`Compressor`] turns script/style text into its bundled form.

mod compress;
pub mod http;

pub use compress::{AssetKind, Compressor, LineCompressor};

use futures::future::BoxFuture;
use reqwest::Client;
use tracing::debug;

use crate::utils::paths::is_remote;

/// Loads an asset from a filesystem path or URL.
pub trait AssetLoader: Send + Sync {
    /// Return the asset's text, or `None` when it cannot be loaded.
    fn load<'a>(&'a self, location: &'a str) -> BoxFuture<'a, Option<String>>;
}

/// [`AssetLoader`] reading local files with tokio and remote ones with reqwest.
///
/// Protocol-relative URLs (`//cdn...`) are fetched over HTTPS.
#[derive(Debug, Clone)]
pub struct DefaultAssetLoader {
    client: Client,
}

impl DefaultAssetLoader {
    /// Create a loader with its own HTTP client.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: http::build_client(),
        }
    }

    /// Create a loader sharing an existing HTTP client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self {
            client,
        }
    }
}

impl Default for DefaultAssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetLoader for DefaultAssetLoader {
    fn load<'a>(&'a self, location: &'a str) -> BoxFuture<'a, Option<String>> {
        Box::pin(async move {
            if is_remote(location) {
                match http::fetch_text(&self.client, location).await {
                    Ok(body) => body,
                    Err(e) => {
                        debug!("Failed to fetch asset {}: {:#}", location, e);
                        None
                    }
                }
            } else {
                match tokio::fs::read(location).await {
                    Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
                    Err(e) => {
                        debug!("Failed to read asset {}: {}", location, e);
                        None
                    }
                }
            }
        })
    }
}
