//! Integration test suite for Diversity
//!
//! End-to-end tests of registries, resolution, rendering, and the `diversity` binary
//! against temporary registry trees and mock API servers.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: The `diversity` binary
//! - **registry**: Install, uninstall, and compound lookups
//! - **remote**: Remote API registry behaviour and caching
//! - **render**: Rendering across registries, bundles, and side-loaded schemas
//! - **resolve**: Dependency expansion and conflict resolution

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod cli;
mod registry;
mod remote;
mod render;
mod resolve;
