//! Package manifest (`package.json`) reading.
//!
//! Only the handful of fields the cache needs are modelled; everything else in
//! the document is ignored. A manifest that exists but cannot be parsed is an
//! error ([`VicError::ManifestReadFailed`]), never a silent "no entry point".
//!
//! # Lookup
//!
//! [`find_package_dir`] mirrors the usual "nearest package directory" rule:
//! starting at a directory, walk towards the file system root and stop at the
//! first directory containing `package.json`. The start directory does not need
//! to exist; the walk simply continues with its ancestors.

use crate::constants::MANIFEST_FILE_NAME;
use crate::core::{Result, VicError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The subset of `package.json` read by the cache.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct PackageManifest {
    /// Package name
    #[serde(default)]
    pub name: Option<String>,

    /// Published version
    #[serde(default)]
    pub version: Option<String>,

    /// Entry module, relative to the manifest directory
    #[serde(default)]
    pub main: Option<String>,
}

impl PackageManifest {
    /// Read and parse a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`VicError::ManifestReadFailed`] if the file cannot be read or is
    /// not a JSON object with correctly typed fields.
    pub async fn read(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            VicError::ManifestReadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        Self::parse(&content).map_err(|e| VicError::ManifestReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Parse manifest content.
    pub fn parse(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// The declared entry point, ignoring an empty `main`.
    pub fn entry_point(&self) -> Option<&str> {
        self.main.as_deref().map(str::trim).filter(|m| !m.is_empty())
    }
}

/// Find the nearest directory at or above `start` that contains `package.json`.
pub async fn find_package_dir(start: &Path) -> Option<PathBuf> {
    for dir in start.ancestors() {
        let candidate = dir.join(MANIFEST_FILE_NAME);
        if tokio::fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
            tracing::trace!("Found manifest at {}", candidate.display());
            return Some(dir.to_path_buf());
        }
    }
    None
}
