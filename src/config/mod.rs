//! CLI configuration.
//!
//! Two things are configured for the `vic` binary:
//!
//! - [`CliHome`] - where the CLI keeps its state (`~/.vic-cli` by default)
//! - [`CliConfig`] - optional settings read from `{cli_home}/config.toml`
//!
//! The library itself never reads either; the CLI turns them into explicit
//! [`PackageOptions`](crate::cache::PackageOptions) and collaborator settings.
//!
//! # Layout
//!
//! ```text
//! ~/.vic-cli/
//! ├── config.toml
//! └── dependencies/          # installer root for cached packages
//!     └── node_modules/      # store directory
//! ```
//!
//! # Precedence
//!
//! Command-line flags and their environment variables win over the config file,
//! which wins over built-in defaults.

mod home;

pub use home::CliHome;

use crate::constants::{
    DEFAULT_INSTALL_TIMEOUT, DEFAULT_INSTALLER_PROGRAM, DEFAULT_LOCK_TIMEOUT, DEFAULT_REGISTRY,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Settings from `config.toml`. Every key is optional.
///
/// ```toml
/// registry = "https://registry.npmmirror.com/"
/// installer = "npminstall"
/// install_timeout_secs = 600
/// lock_timeout_secs = 120
/// check_updates = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Registry base URL.
    pub registry: Option<String>,

    /// Installer program name or path.
    pub installer: Option<String>,

    pub install_timeout_secs: Option<u64>,

    pub lock_timeout_secs: Option<u64>,

    /// Look for a newer CLI release on startup.
    pub check_updates: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            registry: None,
            installer: None,
            install_timeout_secs: None,
            lock_timeout_secs: None,
            check_updates: true,
        }
    }
}

impl CliConfig {
    /// Load `config.toml` from the CLI home, or defaults if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(home: &CliHome) -> Result<Self> {
        let path = home.config_path();
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML for
    /// this schema.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Registry to use, with `flag` taking precedence over the file.
    pub fn registry_url<'a>(&'a self, flag: Option<&'a str>) -> &'a str {
        flag.or(self.registry.as_deref()).unwrap_or(DEFAULT_REGISTRY)
    }

    pub fn installer_program(&self) -> &str {
        self.installer.as_deref().unwrap_or(DEFAULT_INSTALLER_PROGRAM)
    }

    pub fn install_timeout(&self) -> Duration {
        self.install_timeout_secs.map_or(DEFAULT_INSTALL_TIMEOUT, Duration::from_secs)
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout_secs.map_or(DEFAULT_LOCK_TIMEOUT, Duration::from_secs)
    }
}
