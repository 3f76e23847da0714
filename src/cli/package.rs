//! `vic install`, `vic update` and `vic which` - store operations on any package.

use super::CliContext;
use crate::constants::LATEST_VERSION;
use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

/// Install a package version into the store.
#[derive(Debug, Args)]
pub struct InstallCommand {
    /// Package name, e.g. `@vic-cli-test/init`.
    pub name: String,

    /// `latest`, an exact version or a semver range.
    #[arg(long, default_value = LATEST_VERSION)]
    pub version: String,
}

impl InstallCommand {
    pub async fn execute(self, context: &CliContext) -> Result<()> {
        let mut package = context.open(context.store_options(&self.name, &self.version))?;

        if package.exists().await? {
            let version = package.prepare().await?;
            println!("{} {}@{} is already installed", "✓".green(), self.name, version);
            return Ok(());
        }

        let location = package.install().await?;
        let version = package.prepare().await?;
        println!(
            "{} Installed {}@{} into {}",
            "✓".green(),
            self.name,
            version,
            location.display()
        );
        Ok(())
    }
}

/// Move a package to its latest release.
#[derive(Debug, Args)]
pub struct UpdateCommand {
    /// Package name.
    pub name: String,
}

impl UpdateCommand {
    pub async fn execute(self, context: &CliContext) -> Result<()> {
        let mut package = context.open(context.store_options(&self.name, LATEST_VERSION))?;
        let outcome = package.update().await?;

        if outcome.installed {
            println!("{} Updated {} to {}", "✓".green(), self.name, outcome.version);
        } else {
            println!("{} {}@{} is up to date", "✓".green(), self.name, outcome.version);
        }
        Ok(())
    }
}

/// Print the entry module of an installed package.
#[derive(Debug, Args)]
pub struct WhichCommand {
    /// Package name.
    pub name: String,

    /// `latest`, an exact version or a semver range.
    #[arg(long, default_value = LATEST_VERSION)]
    pub version: String,
}

impl WhichCommand {
    pub async fn execute(self, context: &CliContext) -> Result<()> {
        let mut package = context.open(context.store_options(&self.name, &self.version))?;

        if !package.exists().await? {
            bail!(
                "{}@{} is not installed. Run: vic install {} --version {}",
                self.name,
                package.version(),
                self.name,
                self.version
            );
        }

        match package.root_file_path().await? {
            Some(entry) => println!("{}", entry.display()),
            None => bail!("{} declares no entry module", self.name),
        }
        Ok(())
    }
}
