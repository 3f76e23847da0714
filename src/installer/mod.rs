//! Materializing packages on disk.
//!
//! Downloading, unpacking and installing nested dependencies is delegated to
//! an [`Installer`]. The cache only decides *what* to install and *where*; it
//! treats one installer call as a single step that either succeeds or fails.
//!
//! [`CommandInstaller`] runs an external npminstall-compatible program. Tests
//! and embedders can supply their own implementation.

mod command;

pub use command::CommandInstaller;

use async_trait::async_trait;
use semver::Version;
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// One package to install, pinned to a concrete version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    /// Package name, possibly scoped
    pub name: String,
    /// Exact version
    pub version: Version,
}

impl PackageSpec {
    /// Create a package spec.
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Everything an installer needs for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Installer root directory
    pub root: PathBuf,
    /// Version-keyed store directory, if the cache runs in cached mode
    pub store_dir: Option<PathBuf>,
    /// Registry the packages are fetched from
    pub registry: Url,
    /// Packages to install
    pub packages: Vec<PackageSpec>,
}

/// Capability that installs packages into a store directory.
#[async_trait]
pub trait Installer: Send + Sync {
    /// Install every package in `request`.
    ///
    /// # Errors
    ///
    /// Any failure (network, checksum, disk space, missing program) is returned
    /// as-is; the cache wraps it into [`crate::core::VicError::InstallFailed`].
    async fn install(&self, request: &InstallRequest) -> anyhow::Result<()>;
}
