//! vic - versioned package cache and resolver
//!
//! vic is a scaffolding CLI whose commands are implemented by packages published
//! to an npm-compatible registry. This crate maps a dependency request (a package
//! name plus `latest`, an exact version or a range) onto a directory on disk,
//! installs it on demand and hands back the package's entry module.
//!
//! # Architecture Overview
//!
//! ```text
//! cli ──> PackageOptions ──> cache::PackageCache ──> registry::RegistryClient (version lookups)
//!                                   │           └──> installer::Installer     (materialization)
//!                                   └──> manifest (package.json entry point)
//! ```
//!
//! The cache owns all state and failure semantics; the registry and installer
//! are traits so tests and embedders can substitute their own.
//!
//! # Core Modules
//!
//! - [`cache`] - the package cache, its on-disk layout and install locks
//! - [`registry`] - registry trait and the npm HTTP client
//! - [`installer`] - installer trait and the external-program installer
//! - [`manifest`] - reading `package.json` and locating package directories
//! - [`version`] - version requests and the unpinned/pinned state
//! - [`core`] - error types and user-facing error rendering
//!
//! ## Supporting Modules
//!
//! - [`cli`] - the `vic` command line
//! - [`config`] - CLI home and `config.toml`
//! - [`constants`] - shared names, defaults and timeouts
//! - [`utils`] - file system and platform helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use vic_cli::cache::{PackageCache, PackageOptions};
//! use vic_cli::installer::CommandInstaller;
//! use vic_cli::registry::NpmRegistry;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let options = PackageOptions::new("@vic-cli-test/init", "^1.0")
//!     .with_target_path("/home/me/.vic-cli/dependencies")
//!     .with_store_dir("/home/me/.vic-cli/dependencies/node_modules");
//! let mut package = PackageCache::new(options, NpmRegistry::new()?, CommandInstaller::default())?;
//!
//! package.install().await?;
//! println!("{:?}", package.root_file_path().await?);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod installer;
pub mod manifest;
pub mod registry;
pub mod utils;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
