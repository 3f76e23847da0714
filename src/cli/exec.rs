//! `vic exec` - resolve the package behind a command.

use super::{CliContext, CliPackage};
use crate::cache::PackageOptions;
use crate::constants::{EXEC_PACKAGES, LATEST_VERSION};
use anyhow::{Result, anyhow};
use clap::Args;
use std::path::Path;
use tracing::{debug, info, warn};

/// Resolve a command's package and print its entry module.
///
/// Without `--target-path` the package comes from the store: an existing entry
/// is updated to the latest release, a missing one is installed. With
/// `--target-path` the local directory is used as-is.
#[derive(Debug, Args)]
pub struct ExecCommand {
    /// Command to run (`init`).
    pub command: String,

    /// Arguments for the command.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl ExecCommand {
    pub async fn execute(self, context: &CliContext) -> Result<()> {
        let package_name = package_for(&self.command)?;
        debug!("{} -> {} {:?}", self.command, package_name, self.args);

        let package = match &context.target_path {
            Some(target) => resolve_local(context, package_name, target).await?,
            None => resolve_cached(context, package_name).await?,
        };

        match package.root_file_path().await? {
            Some(entry) => println!("{}", entry.display()),
            None => warn!("{} declares no entry module; nothing to run", package.package_name()),
        }
        Ok(())
    }
}

/// The package implementing `command`.
fn package_for(command: &str) -> Result<&'static str> {
    EXEC_PACKAGES
        .iter()
        .find(|(name, _)| *name == command)
        .map(|(_, package)| *package)
        .ok_or_else(|| {
            let known: Vec<&str> = EXEC_PACKAGES.iter().map(|(name, _)| *name).collect();
            anyhow!("Unknown command '{command}'. Available commands: {}", known.join(", "))
        })
}

async fn resolve_cached(context: &CliContext, package_name: &str) -> Result<CliPackage> {
    let mut package = context.open(context.store_options(package_name, LATEST_VERSION))?;

    if package.exists().await? {
        let outcome = package.update().await?;
        debug!("{} at {} (installed: {})", package_name, outcome.version, outcome.installed);
    } else {
        let location = package.install().await?;
        info!("Installed {} into {}", package_name, location.display());
    }
    Ok(package)
}

async fn resolve_local(
    context: &CliContext,
    package_name: &str,
    target: &Path,
) -> Result<CliPackage> {
    let options = PackageOptions::new(package_name, LATEST_VERSION).with_target_path(target);
    let mut package = context.open(options)?;
    if !package.exists().await? {
        warn!("Target path {} does not exist", target.display());
    }
    Ok(package)
}
