//! Tests for version requirements.

use semver::Version;

use super::{Constraint, VersionRequirement};
use crate::core::DiversityError;

fn v(s: &str) -> Version {
    crate::version::parse_version(s).unwrap()
}

#[test]
fn test_wildcard_matches_everything() {
    let req = VersionRequirement::parse("*").unwrap();
    assert!(req.is_any());
    assert!(req.satisfied_by(&v("0.0.1")));
    assert!(req.satisfied_by(&v("99.0.0")));

    let empty = VersionRequirement::parse("  ").unwrap();
    assert!(empty.is_any());
}

#[test]
fn test_caret_below_zero_one_is_exact() {
    let req = VersionRequirement::parse("^0.0.3").unwrap();
    assert_eq!(req.constraint(), &Constraint::Exact(v("0.0.3")));
    assert!(req.satisfied_by(&v("0.0.3")));
    assert!(!req.satisfied_by(&v("0.0.4")));
}

#[test]
fn test_caret_below_one_shares_minor() {
    let req = VersionRequirement::parse("^0.1.2").unwrap();
    assert!(req.satisfied_by(&v("0.1.2")));
    assert!(req.satisfied_by(&v("0.1.7")));
    assert!(!req.satisfied_by(&v("0.1.1")));
    assert!(!req.satisfied_by(&v("0.2.0")));
}

#[test]
fn test_caret_above_one_shares_major() {
    let req = VersionRequirement::parse("^1.2.3").unwrap();
    assert!(req.satisfied_by(&v("1.2.0")));
    assert!(req.satisfied_by(&v("1.9.9")));
    assert!(!req.satisfied_by(&v("1.1.9")));
    assert!(!req.satisfied_by(&v("2.0.0")));

    let partial = VersionRequirement::parse("^1.5").unwrap();
    assert!(partial.satisfied_by(&v("1.6.0")));
    assert!(!partial.satisfied_by(&v("2.0.0")));
}

#[test]
fn test_malformed_caret_is_stripped_and_retried() {
    let req = VersionRequirement::parse("^=1.2.3").unwrap();
    assert!(req.satisfied_by(&v("1.4.0")));
    assert_eq!(req.to_string(), "^=1.2.3");

    let wildcard = VersionRequirement::parse("^1.x").unwrap();
    assert!(wildcard.satisfied_by(&v("1.0.0")));
    assert_eq!(wildcard.to_string(), "^1.x");

    let err = VersionRequirement::parse("^abc").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DiversityError>(),
        Some(DiversityError::InvalidRequirement { requirement }) if requirement == "^abc"
    ));
}

#[test]
fn test_bare_full_version_is_loose() {
    let req = VersionRequirement::parse("1.2.3").unwrap();
    assert_eq!(
        req.constraint(),
        &Constraint::Bounded {
            min: v("1.2.0"),
            below: v("2.0.0")
        }
    );
    assert!(req.satisfied_by(&v("1.2.0")));
    assert!(req.satisfied_by(&v("1.9.0")));
    assert!(!req.satisfied_by(&v("1.1.9")));
    assert!(!req.satisfied_by(&v("2.0.0")));
}

#[test]
fn test_bare_two_part_version_keeps_major() {
    let req = VersionRequirement::parse("1.2").unwrap();
    assert!(req.satisfied_by(&v("1.0.0")));
    assert!(req.satisfied_by(&v("1.4.2")));
    assert!(!req.satisfied_by(&v("0.9.9")));
    assert!(!req.satisfied_by(&v("2.0.0")));
}

#[test]
fn test_bare_zero_version_spans_zero_major() {
    let req = VersionRequirement::parse("0.0.1").unwrap();
    assert!(req.satisfied_by(&v("0.0.0")));
    assert!(req.satisfied_by(&v("0.0.2")));
    assert!(req.satisfied_by(&v("0.9.0")));
    assert!(!req.satisfied_by(&v("1.0.0")));
}

#[test]
fn test_single_part_and_pinned_versions_are_exact() {
    let major = VersionRequirement::parse("3").unwrap();
    assert_eq!(major.constraint(), &Constraint::Exact(v("3.0.0")));

    let pinned = VersionRequirement::parse("=1.2.3").unwrap();
    assert!(pinned.satisfied_by(&v("1.2.3")));
    assert!(!pinned.satisfied_by(&v("1.2.4")));
}

#[test]
fn test_caret_partial_follows_bare_rules() {
    // ^1.5 drops its minor like a bare 1.5
    let req = VersionRequirement::parse("^1.5").unwrap();
    assert!(req.satisfied_by(&v("1.0.0")));
    assert!(!req.satisfied_by(&v("2.0.0")));

    let zero = VersionRequirement::parse("^0.4").unwrap();
    assert!(zero.satisfied_by(&v("0.9.0")));
    assert!(!zero.satisfied_by(&v("0.3.9")));
    assert!(!zero.satisfied_by(&v("1.0.0")));
}

#[test]
fn test_pessimistic_operator() {
    let minor = VersionRequirement::parse("~>1.2").unwrap();
    assert!(minor.satisfied_by(&v("1.9.0")));
    assert!(!minor.satisfied_by(&v("2.0.0")));

    let patch = VersionRequirement::parse("~> 1.2.3").unwrap();
    assert!(patch.satisfied_by(&v("1.2.9")));
    assert!(!patch.satisfied_by(&v("1.3.0")));
    assert!(!patch.satisfied_by(&v("1.2.2")));
}

#[test]
fn test_comparators() {
    let gt = VersionRequirement::parse(">0.0.1").unwrap();
    assert!(!gt.satisfied_by(&v("0.0.1")));
    assert!(gt.satisfied_by(&v("0.0.2")));

    let range = VersionRequirement::parse(">=1.0, <2.0").unwrap();
    assert!(range.satisfied_by(&v("1.5.0")));
    assert!(!range.satisfied_by(&v("2.0.0")));

    let gte = VersionRequirement::parse(">=1.2").unwrap();
    assert!(gte.satisfied_by(&v("1.2.0")));
    assert!(!gte.satisfied_by(&v("1.1.9")));
}

#[test]
fn test_invalid_requirement() {
    let err = VersionRequirement::parse("latest").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DiversityError>(),
        Some(DiversityError::InvalidRequirement { .. })
    ));
}

#[test]
fn test_display_keeps_source() {
    assert_eq!(VersionRequirement::parse(" ^1.0 ").unwrap().to_string(), "^1.0");
    assert_eq!(VersionRequirement::any().to_string(), "*");
    assert_eq!(VersionRequirement::exact(&v("1.0.0")).to_string(), "1.0.0");
}

#[test]
fn test_from_str() {
    let req: VersionRequirement = "^1.0".parse().unwrap();
    assert!(req.satisfied_by(&v("1.3.0")));
}
