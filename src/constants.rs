//! Global constants used throughout the vic codebase.
//!
//! Directory names, file names, timeouts and retry parameters that are shared
//! between the cache, the registry client and the CLI glue live here so the
//! on-disk layout is defined in exactly one place.

use std::time::Duration;

/// Version sentinel that asks the registry for its `latest` dist-tag.
pub const LATEST_VERSION: &str = "latest";

/// Manifest file that declares a package's entry point.
pub const MANIFEST_FILE_NAME: &str = "package.json";

/// CLI home directory name (under the user's home) when `CLI_HOME` is unset.
pub const DEFAULT_CLI_HOME: &str = ".vic-cli";

/// Directory under the CLI home that acts as the installer root.
pub const DEPENDENCIES_DIR: &str = "dependencies";

/// Store directory under the installer root holding one entry per version.
pub const STORE_DIR_NAME: &str = "node_modules";

/// Subdirectory of the store directory holding advisory lock files.
pub const LOCKS_DIR_NAME: &str = ".locks";

/// Registry used when neither the config file nor the command line names one.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// External installer program invoked by [`crate::installer::CommandInstaller`].
pub const DEFAULT_INSTALLER_PROGRAM: &str = "npminstall";

/// Default timeout for cache lock acquisition (120 seconds).
///
/// Long enough for another process to finish a complete install of the same
/// package version while we wait on its lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(120);

/// Age after which an unheld lock file is pruned from the store (7 days).
pub const STALE_LOCK_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default timeout for a single installer run (5 minutes).
pub const DEFAULT_INSTALL_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for establishing a registry connection.
pub const REGISTRY_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for a complete registry request.
pub const REGISTRY_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum backoff delay for exponential backoff (500ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Starting delay for exponential backoff (10ms).
///
/// Doubles on each retry until [`MAX_BACKOFF_DELAY_MS`] is reached.
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Config file name inside the CLI home.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Registry name under which the CLI itself is published, used for the startup update check.
pub const CLI_PACKAGE_NAME: &str = "@vic-cli-test/core";

/// Commands `vic exec` knows, with the package that implements each.
pub const EXEC_PACKAGES: &[(&str, &str)] = &[("init", "@vic-cli-test/init")];
