//! Installer backed by an external program.

use super::{InstallRequest, Installer};
use crate::constants::{DEFAULT_INSTALL_TIMEOUT, DEFAULT_INSTALLER_PROGRAM};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Runs an npminstall-compatible program for each install request.
///
/// The program is invoked as:
///
/// ```text
/// {program} --root={root} [--storeDir={store_dir}] --registry={url} name@version...
/// ```
///
/// Output is captured; stdout is logged at debug level and stderr becomes part
/// of the error when the program exits unsuccessfully.
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    program: String,
    timeout: Duration,
}

impl Default for CommandInstaller {
    fn default() -> Self {
        Self::new(DEFAULT_INSTALLER_PROGRAM)
    }
}

impl CommandInstaller {
    /// Installer running `program` with the default timeout.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_INSTALL_TIMEOUT,
        }
    }

    /// Override how long one installer run may take.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The program this installer runs.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Command-line arguments for `request`.
    pub fn args(request: &InstallRequest) -> Vec<String> {
        let mut args = vec![format!("--root={}", request.root.display())];
        if let Some(store_dir) = &request.store_dir {
            args.push(format!("--storeDir={}", store_dir.display()));
        }
        args.push(format!("--registry={}", request.registry));
        args.extend(request.packages.iter().map(ToString::to_string));
        args
    }
}

#[async_trait]
impl Installer for CommandInstaller {
    async fn install(&self, request: &InstallRequest) -> Result<()> {
        let program = which::which(&self.program).with_context(|| {
            format!("Installer program '{}' was not found in PATH", self.program)
        })?;
        let args = Self::args(request);

        tracing::debug!(target: "installer", "Executing command: {} {}", self.program, args.join(" "));
        let start = std::time::Instant::now();

        let mut cmd = Command::new(&program);
        cmd.args(&args)
            .current_dir(&request.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "{} timed out after {} seconds",
                    self.program,
                    self.timeout.as_secs()
                )
            })?
            .with_context(|| format!("Failed to execute {}", self.program))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            tracing::debug!(target: "installer", "{}", stdout.trim());
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                if stderr.trim().is_empty() { stdout.trim() } else { stderr.trim() }
            );
        }

        tracing::debug!(
            target: "installer",
            "{} finished in {}ms",
            self.program,
            start.elapsed().as_millis()
        );
        Ok(())
    }
}
