//! Concatenated, compressed script and style bundles.
//!
//! A bundle's file name is the SHA-256 of the ordered `(checksum, path)` pairs it is
//! built from, so an unchanged component set maps to an existing file that is reused
//! without loading or compressing anything.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::MinificationOptions;
use crate::assets::{AssetKind, AssetLoader, Compressor};
use crate::component::Component;
use crate::resolver::ResolvedSet;
use crate::utils::safe_write;
use crate::utils::paths::{is_remote, join_location};

/// One asset to bundle.
#[derive(Debug, Clone)]
pub struct BundleEntry {
    /// Checksum of the declaring component
    pub checksum: String,
    /// Path as declared in the spec
    pub path: String,
    /// Where to load it from
    pub location: String,
}

/// The assets of `kind` in `set`, split into bundled entries and URLs left as-is.
pub fn partition(
    set: &ResolvedSet,
    kind: AssetKind,
    include_remotes: bool,
) -> (Vec<BundleEntry>, Vec<String>) {
    let mut bundled = Vec::new();
    let mut kept = Vec::new();
    for component in set {
        for path in paths(component, kind) {
            if is_remote(path) && !include_remotes {
                let url = component.public_location(path);
                if !kept.contains(&url) {
                    kept.push(url);
                }
                continue;
            }
            let location = component.asset_location(path);
            if bundled.iter().any(|e: &BundleEntry| e.location == location) {
                continue;
            }
            bundled.push(BundleEntry {
                checksum: component.checksum().to_string(),
                path: path.clone(),
                location,
            });
        }
    }
    (bundled, kept)
}

fn paths(component: &Component, kind: AssetKind) -> &[String] {
    match kind {
        AssetKind::Script => component.scripts(),
        AssetKind::Style => component.styles(),
    }
}

/// Content-derived bundle name.
pub fn digest(entries: &[BundleEntry]) -> String {
    let mut hasher = Sha256::new();
    for entry in entries {
        hasher.update(entry.checksum.as_bytes());
        hasher.update(b"\n");
        hasher.update(entry.path.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// Load, compress, and concatenate `entries`. Missing assets are skipped.
pub async fn concatenate(
    entries: &[BundleEntry],
    kind: AssetKind,
    compress: bool,
    loader: &dyn AssetLoader,
    compressor: &dyn Compressor,
) -> String {
    let mut out = String::new();
    for entry in entries {
        let Some(text) = loader.load(&entry.location).await else {
            warn!("Skipping missing {} '{}' in bundle", kind, entry.path);
            continue;
        };
        let text = if compress {
            compressor.compress(&text, kind)
        } else {
            text
        };
        out.push_str(&text);
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// Build (or reuse) the bundle file for `entries` and return its public URL.
///
/// Returns `None` when there is nothing to bundle.
pub async fn build(
    entries: &[BundleEntry],
    kind: AssetKind,
    options: &MinificationOptions,
    loader: &dyn AssetLoader,
    compressor: &dyn Compressor,
) -> Result<Option<String>> {
    if entries.is_empty() {
        return Ok(None);
    }

    let file_name = format!("{}.{}", digest(entries), kind.extension());
    let relative = format!("{}/{file_name}", kind.directory());
    let url = join_location(&options.base_url, &relative);
    let path: PathBuf = options.base_dir.join(kind.directory()).join(&file_name);

    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        debug!("Reusing {} bundle {}", kind, file_name);
        return Ok(Some(url));
    }

    let content = concatenate(entries, kind, true, loader, compressor).await;
    let target = path.clone();
    tokio::task::spawn_blocking(move || safe_write(&target, &content))
        .await
        .context("Bundle write task panicked")??;
    info!("Wrote {} bundle {} ({} assets)", kind, file_name, entries.len());
    Ok(Some(url))
}
