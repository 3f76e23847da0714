//! Location of the CLI's state directory.

use crate::constants::{CONFIG_FILE_NAME, DEFAULT_CLI_HOME, DEPENDENCIES_DIR, STORE_DIR_NAME};
use crate::utils::platform::get_home_dir;
use anyhow::{Result, bail};
use std::path::{Path, PathBuf};

/// The CLI home directory and the paths derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliHome {
    root: PathBuf,
}

impl CliHome {
    /// Use `root` as the CLI home.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Resolve the CLI home under the user's home directory.
    ///
    /// `name` (the `CLI_HOME` setting) is joined onto the home directory, so a
    /// relative name like `.vic-dev` lands next to the default and an absolute
    /// path replaces it.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined or does not
    /// exist.
    pub fn resolve(name: Option<&str>) -> Result<Self> {
        let home = get_home_dir()?;
        if !home.is_dir() {
            bail!("Home directory {} does not exist", home.display());
        }
        let name = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or(DEFAULT_CLI_HOME);
        Ok(Self::new(home.join(name)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{cli_home}/config.toml`
    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    /// Installer root for cached packages: `{cli_home}/dependencies`.
    pub fn dependencies_dir(&self) -> PathBuf {
        self.root.join(DEPENDENCIES_DIR)
    }

    /// Store directory: `{cli_home}/dependencies/node_modules`.
    pub fn store_dir(&self) -> PathBuf {
        self.dependencies_dir().join(STORE_DIR_NAME)
    }
}
