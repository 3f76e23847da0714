//! Platform-specific helpers.
//!
//! Entry paths handed to callers always use forward slashes so that the same
//! cache entry prints identically on Windows, macOS and Linux.

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Checks if the current platform is Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Gets the home directory path for the current user.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined, which the CLI
/// treats as fatal since the cache lives below it.
pub fn get_home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        let platform_help = if is_windows() {
            "On Windows: Check that the USERPROFILE environment variable is set"
        } else {
            "On Unix/Linux: Check that the HOME environment variable is set"
        };
        anyhow::anyhow!("Could not determine home directory.\n\n{platform_help}")
    })
}

/// Normalizes a path to forward slashes.
///
/// Windows extended-length prefixes (`\\?\`, `\\?\UNC\`) are stripped first, so
/// a canonicalized Windows path comes out as `C:/...` or `//server/share/...`.
///
/// # Examples
///
/// ```rust
/// use vic_cli::utils::platform::normalize_path_for_storage;
///
/// assert_eq!(normalize_path_for_storage(r"C:\cache\pkg\lib\index.js"), "C:/cache/pkg/lib/index.js");
/// assert_eq!(normalize_path_for_storage("/cache/pkg/lib/index.js"), "/cache/pkg/lib/index.js");
/// ```
pub fn normalize_path_for_storage<P: AsRef<Path>>(path: P) -> String {
    let path_str = path.as_ref().to_string_lossy();

    let cleaned = if let Some(stripped) = path_str.strip_prefix(r"\\?\UNC\") {
        format!("//{stripped}")
    } else if let Some(stripped) = path_str.strip_prefix(r"\\?\") {
        stripped.to_string()
    } else {
        path_str.to_string()
    };

    cleaned.replace('\\', "/")
}

/// Makes `path` absolute against the current directory without touching the disk.
///
/// Unlike `canonicalize`, the path does not have to exist and symlinks are kept.
///
/// # Errors
///
/// Returns an error if the current directory cannot be determined.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}
