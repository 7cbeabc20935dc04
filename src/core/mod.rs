//! Core types shared across Diversity.
//!
//! Only the error taxonomy lives here; the domain types are in [`crate::component`],
//! [`crate::registry`], and [`crate::engine`].

pub mod error;

pub use error::{DiversityError, ErrorContext, user_friendly_error};
