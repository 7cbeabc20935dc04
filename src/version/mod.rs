//! Version parsing and ordering for components.
//!
//! Component specs, directory names, and registry APIs do not always carry full
//! semantic versions, so parsing here is lenient: a leading `v` is dropped and
//! missing minor/patch parts are padded with zero (`1.1` becomes `1.1.0`).
//! Requirement parsing lives in [`requirement`].

pub mod requirement;

pub use requirement::VersionRequirement;

use anyhow::Result;
use semver::Version;

use crate::core::DiversityError;

/// Parse a version leniently.
///
/// # Examples
///
/// ```rust
/// use diversity::version::parse_version;
///
/// assert_eq!(parse_version("1.1")?.to_string(), "1.1.0");
/// assert_eq!(parse_version("v2.0.3")?.to_string(), "2.0.3");
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn parse_version(input: &str) -> Result<Version> {
    parse_version_parts(input).map(|(version, _)| version).ok_or_else(|| {
        DiversityError::InvalidVersion {
            version: input.to_string(),
        }
        .into()
    })
}

/// Parse a version leniently and report how many numeric parts were written.
///
/// `"1.2"` yields `(1.2.0, 2)`. Returns `None` when the input is not a version.
pub(crate) fn parse_version_parts(input: &str) -> Option<(Version, usize)> {
    let trimmed = input.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

    let split_at = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (numeric, suffix) = trimmed.split_at(split_at);

    let parts: Vec<&str> = numeric.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    if parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }

    let mut padded: Vec<&str> = parts.clone();
    while padded.len() < 3 {
        padded.push("0");
    }

    Version::parse(&format!("{}{}", padded.join("."), suffix)).ok().map(|v| (v, parts.len()))
}

/// Sort versions newest first.
pub fn sort_descending(versions: &mut [Version]) {
    versions.sort_by(|a, b| b.cmp(a));
}
