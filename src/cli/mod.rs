//! Command-line interface for vic.
//!
//! The CLI is the only layer that reads the environment. It turns flags,
//! environment variables and `config.toml` into explicit values, builds the
//! registry client and installer, and hands [`PackageOptions`] to the cache.
//!
//! # Commands
//!
//! - `exec` - resolve the package behind a CLI command and print its entry module
//! - `install` - install a package version into the store
//! - `update` - move a cached package to its latest release
//! - `which` - print the entry module of an installed package
//!
//! # Global Options
//!
//! | Flag | Environment | Purpose |
//! |------|-------------|---------|
//! | `--verbose`, `-v` (`--debug`) | | debug logging |
//! | `--quiet`, `-q` | | errors only |
//! | `--log-level` | `LOG_LEVEL` | explicit level (`verbose` means debug) |
//! | `--target-path` | `CLI_TARGET_PATH` | use a local package directory |
//! | `--cli-home` | `CLI_HOME` | CLI home, relative to the user's home |
//! | `--registry` | `VIC_REGISTRY` | registry base URL |
//!
//! `RUST_LOG`, when set, overrides all logging flags.
//!
//! # Example
//!
//! ```bash
//! # Resolve (installing or updating as needed) and print the init entry point
//! vic exec init my-project
//!
//! # Use a package checked out locally instead of the store
//! vic --target-path ~/src/vic-init exec init
//!
//! # Pin a specific version into the store
//! vic install @vic-cli-test/init --version 1.0.2
//! ```

mod exec;
mod package;
pub mod update_check;

use crate::cache::{PackageCache, PackageOptions};
use crate::config::{CliConfig, CliHome};
use crate::installer::CommandInstaller;
use crate::registry::NpmRegistry;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// The cache type the CLI drives.
pub type CliPackage = PackageCache<NpmRegistry, CommandInstaller>;

/// vic command-line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "vic",
    about = "vic - scaffolding CLI with a versioned package cache",
    version,
    long_about = "vic resolves the packages behind its commands from an npm registry, keeps every \
                  installed version in a local store and hands back their entry modules."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output.
    #[arg(short, long, global = true, visible_alias = "debug", conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log level (`error`, `warn`, `info`, `debug`, `trace`; `verbose` is an alias for `debug`).
    #[arg(long, global = true, env = "LOG_LEVEL", hide_env_values = true)]
    log_level: Option<String>,

    /// Use the package in this directory instead of the store.
    #[arg(long, global = true, env = "CLI_TARGET_PATH")]
    target_path: Option<PathBuf>,

    /// CLI home directory, joined onto the user's home.
    #[arg(long, global = true, env = "CLI_HOME")]
    cli_home: Option<String>,

    /// Registry base URL.
    #[arg(long, global = true, env = "VIC_REGISTRY")]
    registry: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve the package behind a command and print its entry module.
    Exec(exec::ExecCommand),

    /// Install a package into the store.
    Install(package::InstallCommand),

    /// Update a cached package to its latest release.
    Update(package::UpdateCommand),

    /// Print the entry module of an installed package.
    Which(package::WhichCommand),
}

impl Cli {
    /// The `tracing` filter directive selected by the logging flags.
    pub fn log_filter(&self) -> String {
        if self.verbose {
            return "debug".to_string();
        }
        if self.quiet {
            return "error".to_string();
        }
        match self.log_level.as_deref().map(str::trim) {
            Some(level) if level.eq_ignore_ascii_case("verbose") => "debug".to_string(),
            Some(level) if !level.is_empty() => level.to_ascii_lowercase(),
            _ => "info".to_string(),
        }
    }

    /// Run the selected command.
    ///
    /// # Errors
    ///
    /// Returns the command's error; `main` renders it with
    /// [`user_friendly_error`](crate::core::user_friendly_error).
    pub async fn execute(self) -> Result<()> {
        let home = CliHome::resolve(self.cli_home.as_deref())?;
        let config = CliConfig::load(&home).await?;
        tracing::debug!("CLI home: {}", home.root().display());

        let context = CliContext {
            registry: config.registry_url(self.registry.as_deref()).to_string(),
            target_path: self.target_path,
            home,
            config,
        };

        if context.config.check_updates {
            update_check::warn_if_outdated(&context).await;
        }

        match self.command {
            Commands::Exec(cmd) => cmd.execute(&context).await,
            Commands::Install(cmd) => cmd.execute(&context).await,
            Commands::Update(cmd) => cmd.execute(&context).await,
            Commands::Which(cmd) => cmd.execute(&context).await,
        }
    }
}

/// Resolved settings shared by every command.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub home: CliHome,
    pub config: CliConfig,
    /// Registry base URL after flag/config/default precedence.
    pub registry: String,
    pub target_path: Option<PathBuf>,
}

impl CliContext {
    /// Registry client for the configured registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry URL is invalid.
    pub fn registry_client(&self) -> Result<NpmRegistry> {
        NpmRegistry::with_url(&self.registry)
            .with_context(|| format!("Cannot use registry '{}'", self.registry))
    }

    pub fn installer(&self) -> CommandInstaller {
        CommandInstaller::new(self.config.installer_program())
            .with_timeout(self.config.install_timeout())
    }

    /// Options for `name@version` in the shared store.
    pub fn store_options(&self, name: &str, version: &str) -> PackageOptions {
        PackageOptions::new(name, version)
            .with_target_path(self.home.dependencies_dir())
            .with_store_dir(self.home.store_dir())
    }

    /// Build a cache for `options` with the configured collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error if the options or the registry URL are invalid.
    pub fn open(&self, options: PackageOptions) -> Result<CliPackage> {
        let package = PackageCache::new(options, self.registry_client()?, self.installer())?;
        Ok(package.with_lock_timeout(self.config.lock_timeout()))
    }
}
