//! Small helpers shared by the registry, asset, and engine modules.

pub mod fs;
pub mod paths;

pub use fs::{atomic_write, safe_write};
pub use paths::{is_remote, join_location};
