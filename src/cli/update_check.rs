//! Startup check for newer releases of the CLI itself.
//!
//! The check is advisory: any failure is logged at debug level and the
//! command carries on.

use super::CliContext;
use crate::constants::CLI_PACKAGE_NAME;
use crate::core::Result;
use crate::registry::RegistryClient;
use crate::version::newer_versions;
use colored::Colorize;
use semver::Version;
use tracing::{debug, warn};

/// The newest published version of `package` above `current`, if any.
///
/// # Errors
///
/// Registry errors are returned unchanged.
pub async fn newest_release<R: RegistryClient>(
    registry: &R,
    package: &str,
    current: &Version,
) -> Result<Option<Version>> {
    let versions = registry.versions(package).await?;
    Ok(newer_versions(current, &versions).into_iter().next())
}

/// Warn when a newer CLI release is published.
pub async fn warn_if_outdated(context: &CliContext) {
    let current = match Version::parse(env!("CARGO_PKG_VERSION")) {
        Ok(version) => version,
        Err(e) => {
            debug!("Skipping update check: {e}");
            return;
        }
    };

    let registry = match context.registry_client() {
        Ok(registry) => registry,
        Err(e) => {
            debug!("Skipping update check: {e:#}");
            return;
        }
    };

    match newest_release(&registry, CLI_PACKAGE_NAME, &current).await {
        Ok(Some(latest)) => warn!(
            "{} {} is available (installed: {}). Update with: {}",
            CLI_PACKAGE_NAME,
            latest.to_string().green(),
            current.to_string().yellow(),
            format!("npm install -g {CLI_PACKAGE_NAME}").cyan()
        ),
        Ok(None) => debug!("{} {} is up to date", CLI_PACKAGE_NAME, current),
        Err(e) => debug!("Update check failed: {e}"),
    }
}
