//! Core types shared by every vic module.
//!
//! - [`VicError`] - typed failures of the package cache
//! - [`ErrorContext`] / [`user_friendly_error`] - CLI rendering of those failures
//! - [`Result`] - result alias used by the library operations

pub mod error;

pub use error::{ErrorContext, VicError, user_friendly_error};

/// Result alias for package cache operations.
pub type Result<T> = std::result::Result<T, VicError>;
