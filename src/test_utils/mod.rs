//! Test doubles for the cache's collaborators.
//!
//! [`FakeRegistry`] answers version lookups from an in-memory table and
//! [`RecordingInstaller`] records every install request, materializing a
//! minimal package on disk the way a real installer would. Both are cheap to
//! clone; clones share their state, so a test can hand one copy to a
//! [`PackageCache`](crate::cache::PackageCache) and keep another to inspect.
//!
//! # Example
//!
//! ```rust,no_run
//! use vic_cli::cache::{PackageCache, PackageOptions};
//! use vic_cli::test_utils::{FakeRegistry, RecordingInstaller};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = FakeRegistry::new().with_versions("@scope/pkg", &["1.0.0", "1.2.3"]);
//! let installer = RecordingInstaller::new();
//!
//! let options = PackageOptions::new("@scope/pkg", "latest").with_store_dir("/tmp/store");
//! let mut cache = PackageCache::new(options, registry.clone(), installer.clone())?;
//! cache.install().await?;
//!
//! assert_eq!(installer.requests().len(), 1);
//! # Ok(())
//! # }
//! ```

use crate::cache::{cache_key_prefix, entry_path};
use crate::constants::MANIFEST_FILE_NAME;
use crate::core::{Result, VicError};
use crate::installer::{InstallRequest, Installer};
use crate::registry::RegistryClient;
use crate::version::{max_version, parse_version};
use async_trait::async_trait;
use semver::Version;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Entry point written into every package [`RecordingInstaller`] materializes.
pub const FAKE_ENTRY_POINT: &str = "lib/index.js";

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` if given, otherwise
/// `RUST_LOG`; with neither, tests stay silent.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

#[derive(Debug, Default)]
struct RegistryState {
    versions: HashMap<String, Vec<Version>>,
    latest: HashMap<String, Version>,
    failure: Option<String>,
}

/// In-memory [`RegistryClient`].
///
/// `latest` defaults to the highest stable version of a package unless set
/// explicitly with [`with_latest`](Self::with_latest).
#[derive(Debug, Clone)]
pub struct FakeRegistry {
    url: Url,
    state: Arc<Mutex<RegistryState>>,
    latest_calls: Arc<AtomicUsize>,
    version_calls: Arc<AtomicUsize>,
}

impl Default for FakeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRegistry {
    /// An empty registry at `https://registry.test/`.
    pub fn new() -> Self {
        Self {
            url: Url::parse("https://registry.test/").expect("static URL"),
            state: Arc::default(),
            latest_calls: Arc::default(),
            version_calls: Arc::default(),
        }
    }

    /// Publish `versions` of `name`.
    #[must_use]
    pub fn with_versions(self, name: &str, versions: &[&str]) -> Self {
        for version in versions {
            self.publish(name, version);
        }
        self
    }

    /// Point `latest` of `name` at `version`, publishing it if needed.
    #[must_use]
    pub fn with_latest(self, name: &str, version: &str) -> Self {
        self.set_latest(name, version);
        self
    }

    /// Publish one more version, as if a release happened mid-test.
    pub fn publish(&self, name: &str, version: &str) {
        let version = parse_version(version).expect("valid test version");
        let mut state = self.state.lock().expect("registry state");
        let versions = state.versions.entry(name.to_string()).or_default();
        if !versions.contains(&version) {
            versions.push(version);
        }
    }

    /// Move the `latest` tag of `name`.
    pub fn set_latest(&self, name: &str, version: &str) {
        self.publish(name, version);
        let version = parse_version(version).expect("valid test version");
        self.state.lock().expect("registry state").latest.insert(name.to_string(), version);
    }

    /// Make every lookup fail with [`VicError::RegistryUnavailable`].
    pub fn fail_with(&self, reason: &str) {
        self.state.lock().expect("registry state").failure = Some(reason.to_string());
    }

    /// Number of `resolve_latest` calls so far.
    pub fn latest_calls(&self) -> usize {
        self.latest_calls.load(Ordering::SeqCst)
    }

    /// Number of `versions` calls so far, including those made by `resolve_range`.
    pub fn version_calls(&self) -> usize {
        self.version_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self, state: &RegistryState) -> Result<()> {
        match &state.failure {
            Some(reason) => Err(VicError::RegistryUnavailable {
                registry: self.url.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RegistryClient for FakeRegistry {
    fn default_registry(&self) -> &Url {
        &self.url
    }

    async fn versions(&self, name: &str) -> Result<Vec<Version>> {
        self.version_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().expect("registry state");
        self.check_available(&state)?;
        state.versions.get(name).cloned().ok_or_else(|| VicError::PackageNotFound {
            name: name.to_string(),
        })
    }

    async fn resolve_latest(&self, name: &str) -> Result<Version> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().expect("registry state");
        self.check_available(&state)?;
        if let Some(latest) = state.latest.get(name) {
            return Ok(latest.clone());
        }
        state.versions.get(name).and_then(|versions| max_version(versions)).ok_or_else(|| {
            VicError::PackageNotFound {
                name: name.to_string(),
            }
        })
    }
}

/// [`Installer`] that records requests and writes a stub package.
///
/// For each requested package it creates the cache entry (or, without a store
/// directory, the root itself) containing a `package.json` whose `main` is
/// [`FAKE_ENTRY_POINT`], plus that entry file.
#[derive(Debug, Clone, Default)]
pub struct RecordingInstaller {
    requests: Arc<Mutex<Vec<InstallRequest>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl RecordingInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent installs fail with `reason` without touching the disk.
    pub fn fail_with(&self, reason: &str) {
        *self.failure.lock().expect("installer state") = Some(reason.to_string());
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<InstallRequest> {
        self.requests.lock().expect("installer state").clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().expect("installer state").len()
    }
}

#[async_trait]
impl Installer for RecordingInstaller {
    async fn install(&self, request: &InstallRequest) -> anyhow::Result<()> {
        self.requests.lock().expect("installer state").push(request.clone());

        let failure = self.failure.lock().expect("installer state").clone();
        if let Some(reason) = failure {
            anyhow::bail!("{reason}");
        }

        for package in &request.packages {
            let dir = match &request.store_dir {
                Some(store) => entry_path(
                    store,
                    &cache_key_prefix(&package.name),
                    &package.version,
                    &package.name,
                ),
                None => request.root.clone(),
            };
            tokio::fs::create_dir_all(dir.join("lib")).await?;
            let manifest = serde_json::json!({
                "name": package.name,
                "version": package.version.to_string(),
                "main": FAKE_ENTRY_POINT,
            });
            tokio::fs::write(dir.join(MANIFEST_FILE_NAME), serde_json::to_vec_pretty(&manifest)?)
                .await?;
            tokio::fs::write(dir.join(FAKE_ENTRY_POINT), "module.exports = {};\n").await?;
        }
        Ok(())
    }
}
