//! Cross-platform utilities and helpers
//!
//! - [`fs`] - Async directory checks and lexical path normalization
//! - [`platform`] - Home directory lookup and separator normalization

pub mod fs;
pub mod platform;

pub use fs::{ensure_dir, normalize_path};
pub use platform::{get_home_dir, normalize_path_for_storage};
