//! Version requirements for component dependencies and settings references.
//!
//! A [`VersionRequirement`] is parsed once and then used as a predicate over
//! [`semver::Version`]. The accepted syntax mixes npm-style carets with
//! RubyGems-style pessimistic ranges, because component specs in the wild use both:
//!
//! | Input          | Matches                                   |
//! |----------------|-------------------------------------------|
//! | `*` or empty   | every version                             |
//! | `1.2.3`        | `>= 1.2.0, < 2.0.0`                       |
//! | `1.2`          | `>= 1.0.0, < 2.0.0`                       |
//! | `0.0.1`        | `>= 0.0.0, < 1.0.0`                       |
//! | `1`            | exactly `1.0.0`                           |
//! | `=1.2.3`       | exactly `1.2.3`                           |
//! | `^0.0.3`       | exactly `0.0.3` (below `0.1.0`)           |
//! | `^0.4.1`       | `>= 0.4.1, < 0.5.0` (below `1.0.0`)       |
//! | `^1.2.3`       | `>= 1.2.0, < 2.0.0`                       |
//! | `~>1.2`        | `>= 1.2.0, < 2.0.0`                       |
//! | `~>1.2.3`      | `>= 1.2.3, < 1.3.0`                       |
//! | `>=1.0, <2.0`  | semver comparators                        |
//!
//! Bare versions are loose: the last written part is dropped and the rest is read as
//! a pessimistic range, so `1.2.3` and `1.2` both mean "any 1.x". Pin a version with
//! `=`.
//!
//! A caret body that does not parse (`^=1.2.3`, `^v1.2`, `^1.x`) is retried once with
//! every character other than digits and dots stripped, along with trailing dots.

use anyhow::Result;
use semver::{Version, VersionReq};
use std::fmt;
use std::str::FromStr;

use crate::core::DiversityError;
use crate::version::parse_version_parts;

/// A parsed version-range predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRequirement {
    source: String,
    constraint: Constraint,
}

/// The normalized form of a requirement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// Any version
    Any,
    /// Exactly this version
    Exact(Version),
    /// Half-open interval `[min, below)`
    Bounded {
        /// Inclusive lower bound
        min: Version,
        /// Exclusive upper bound
        below: Version,
    },
    /// Plain semver comparators (`>=1.0`, `<2`, `~1.2`, ...)
    Comparators(VersionReq),
}

impl VersionRequirement {
    /// Parse a requirement string.
    ///
    /// # Errors
    ///
    /// Returns [`DiversityError::InvalidRequirement`] when the string is neither a
    /// caret range, a pessimistic range, a bare version, nor valid semver comparators.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use diversity::version::{VersionRequirement, parse_version};
    ///
    /// let req = VersionRequirement::parse("^0.1.2")?;
    /// assert!(req.satisfied_by(&parse_version("0.1.9")?));
    /// assert!(!req.satisfied_by(&parse_version("0.2.0")?));
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let constraint = Self::normalize(trimmed).ok_or_else(|| DiversityError::InvalidRequirement {
            requirement: trimmed.to_string(),
        })?;

        Ok(Self {
            source: trimmed.to_string(),
            constraint,
        })
    }

    /// The requirement that every version satisfies.
    #[must_use]
    pub fn any() -> Self {
        Self {
            source: "*".to_string(),
            constraint: Constraint::Any,
        }
    }

    /// A requirement matching exactly one version.
    #[must_use]
    pub fn exact(version: &Version) -> Self {
        Self {
            source: version.to_string(),
            constraint: Constraint::Exact(version.clone()),
        }
    }

    /// Whether `version` satisfies this requirement.
    #[must_use]
    pub fn satisfied_by(&self, version: &Version) -> bool {
        match &self.constraint {
            Constraint::Any => true,
            Constraint::Exact(v) => v == version,
            Constraint::Bounded {
                min,
                below,
            } => version >= min && version < below,
            Constraint::Comparators(req) => req.matches(version),
        }
    }

    /// Whether this requirement accepts every version.
    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self.constraint, Constraint::Any)
    }

    /// The normalized constraint.
    #[must_use]
    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    /// The requirement as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn normalize(input: &str) -> Option<Constraint> {
        if input.is_empty() || input == "*" {
            return Some(Constraint::Any);
        }

        if let Some(body) = input.strip_prefix('^') {
            let body = body.trim();
            let (version, parts) = parse_version_parts(body).or_else(|| {
                let stripped: String =
                    body.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
                parse_version_parts(stripped.trim_end_matches('.'))
            })?;
            return Some(caret(version, parts));
        }

        if let Some(body) = input.strip_prefix("~>") {
            let (version, parts) = parse_version_parts(body.trim())?;
            return Some(pessimistic(version, parts));
        }

        if let Some((version, parts)) = parse_version_parts(input) {
            return Some(loose(version, parts));
        }

        VersionReq::parse(input).ok().map(Constraint::Comparators)
    }
}

/// Caret normalization: below `0.1.0` only the exact version, below `1.0.0` a
/// pessimistic range over the written parts, otherwise a loose bare version.
fn caret(version: Version, parts: usize) -> Constraint {
    if version < Version::new(0, 1, 0) {
        Constraint::Exact(version)
    } else if version < Version::new(1, 0, 0) {
        pessimistic(version, parts)
    } else {
        loose(version, parts)
    }
}

/// A bare version drops its last written part and becomes a pessimistic range over
/// the rest; a single part is exact.
fn loose(version: Version, parts: usize) -> Constraint {
    match parts {
        3 => pessimistic(Version::new(version.major, version.minor, 0), 2),
        2 => pessimistic(Version::new(version.major, 0, 0), 1),
        _ => Constraint::Exact(version),
    }
}

/// `~>` bumps the second-to-last written part.
fn pessimistic(version: Version, parts: usize) -> Constraint {
    let below = match parts {
        3 => Version::new(version.major, version.minor + 1, 0),
        _ => Version::new(version.major + 1, 0, 0),
    };
    Constraint::Bounded {
        min: version,
        below,
    }
}

impl fmt::Display for VersionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for VersionRequirement {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Default for VersionRequirement {
    fn default() -> Self {
        Self::any()
    }
}

#[cfg(test)]
mod tests;
