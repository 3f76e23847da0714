//! Versioned package cache.
//!
//! [`PackageCache`] maps one package request (name + version request) onto a
//! directory on disk, installing it on demand and locating its entry module.
//!
//! # Modes
//!
//! The mode is fixed at construction by whether a store directory is configured:
//!
//! - **Cached** (`store_dir` set): packages live in a shared, version-keyed store.
//!   Versions are pinned through the registry and every version gets its own
//!   directory, so several versions of a package coexist.
//! - **Local** (`store_dir` unset): the caller points at a fixed directory
//!   (`target_path`), typically a package under development. Nothing in it is
//!   version-managed.
//!
//! # Store Layout
//!
//! ```text
//! {store_dir}/
//! ├── _scope_pkg@1.2.3@scope/pkg/      # one entry per name + version
//! │   ├── package.json
//! │   └── lib/index.js
//! ├── _scope_pkg@1.3.0@scope/pkg/
//! └── .locks/
//!     └── _scope_pkg@1.3.0.lock        # held while that entry is installed
//! ```
//!
//! The entry name `_{prefix}@{version}@{name}` is a pure function of the store
//! directory, the package name and the pinned version, and matches the layout
//! npminstall-style installers produce, so existing stores are reused as-is.
//!
//! # Version Pinning
//!
//! Requests for `latest` or a range are pinned by [`PackageCache::prepare`]; every
//! operation that computes a path goes through it first, so a path is never
//! derived from an unpinned version.
//!
//! # Example
//!
//! ```rust,no_run
//! use vic_cli::cache::{PackageCache, PackageOptions};
//! use vic_cli::installer::CommandInstaller;
//! use vic_cli::registry::NpmRegistry;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let options = PackageOptions::new("@vic-cli-test/init", "latest")
//!     .with_target_path("/home/me/.vic-cli/dependencies")
//!     .with_store_dir("/home/me/.vic-cli/dependencies/node_modules");
//! let mut package = PackageCache::new(options, NpmRegistry::new()?, CommandInstaller::default())?;
//!
//! if package.exists().await? {
//!     package.update().await?;
//! } else {
//!     package.install().await?;
//! }
//!
//! if let Some(entry) = package.root_file_path().await? {
//!     println!("{}", entry.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod lock;


use crate::constants::{DEFAULT_LOCK_TIMEOUT, MANIFEST_FILE_NAME, STALE_LOCK_TTL};
use crate::core::{Result, VicError};
use crate::installer::{InstallRequest, Installer, PackageSpec};
use crate::manifest::{PackageManifest, find_package_dir};
use crate::registry::RegistryClient;
use crate::utils::fs::{ensure_dir, exists, is_dir, normalize_path};
use crate::utils::platform::{absolute_path, normalize_path_for_storage};
use crate::version::{PackageVersion, VersionSpec};
use lock::{CacheLock, cleanup_stale_locks};
use semver::Version;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration record for one package request.
///
/// Keys use camelCase when deserialized (`targetPath`, `storeDir`,
/// `packageName`, `packageVersion`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PackageOptions {
    /// Local-mode directory and installer root.
    #[serde(default)]
    pub target_path: Option<PathBuf>,
    /// Shared version-keyed store; selects cached mode.
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
    /// Package name, possibly scoped.
    #[serde(default)]
    pub package_name: String,
    /// `latest`, a concrete version, or a range.
    #[serde(default)]
    pub package_version: String,
}

impl PackageOptions {
    /// Options for `name` at `version` with no directories set yet.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            package_name: name.into(),
            package_version: version.into(),
            ..Self::default()
        }
    }

    /// Set the target path.
    #[must_use]
    pub fn with_target_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_path = Some(path.into());
        self
    }

    /// Set the store directory, switching the request to cached mode.
    #[must_use]
    pub fn with_store_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_dir = Some(path.into());
        self
    }

    /// Build options from an untyped document.
    ///
    /// # Errors
    ///
    /// [`VicError::InvalidConfiguration`] if the document is null, not an
    /// object, or has unknown or mistyped fields.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Null => Err(VicError::invalid_config("options must not be empty")),
            serde_json::Value::Object(_) => serde_json::from_value(value)
                .map_err(|e| VicError::invalid_config(format!("malformed options: {e}"))),
            _ => Err(VicError::invalid_config("options must be an object")),
        }
    }
}

/// Operating mode, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Caller-provided directory, no version management.
    Local,
    /// Shared version-keyed store.
    Cached,
}

/// Result of [`PackageCache::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// The latest published version, now pinned.
    pub version: Version,
    /// Whether the installer ran.
    pub installed: bool,
}

/// Derive the cache key prefix for a package name.
///
/// ```rust
/// assert_eq!(vic_cli::cache::cache_key_prefix("@vic-cli-test/init"), "@vic-cli-test_init");
/// ```
pub fn cache_key_prefix(package_name: &str) -> String {
    package_name.replace('/', "_")
}

/// Directory of one cache entry: `{store_dir}/_{prefix}@{version}@{name}`.
///
/// The separator inside `name` is kept, so scoped names produce a nested path.
pub fn entry_path(store_dir: &Path, prefix: &str, version: &Version, name: &str) -> PathBuf {
    let mut path = store_dir.to_path_buf();
    for segment in format!("_{prefix}@{version}@{name}").split('/') {
        path.push(segment);
    }
    path
}

/// A package request resolved against a registry and materialized on disk.
///
/// Created per invocation; the durable state is the store directory, not this
/// value. See the [module documentation](self) for the on-disk layout.
pub struct PackageCache<R, I> {
    target_path: Option<PathBuf>,
    store_dir: Option<PathBuf>,
    package_name: String,
    version: PackageVersion,
    cache_key_prefix: String,
    mode: CacheMode,
    lock_timeout: Duration,
    registry: R,
    installer: I,
}

impl<R, I> PackageCache<R, I>
where
    R: RegistryClient,
    I: Installer,
{
    /// Validate `options` and build the cache entity. Performs no I/O.
    ///
    /// # Errors
    ///
    /// [`VicError::InvalidConfiguration`] if the package name or version is
    /// empty, the version is not `latest`/a version/a range, or neither a
    /// target path nor a store directory is given.
    pub fn new(options: PackageOptions, registry: R, installer: I) -> Result<Self> {
        let PackageOptions {
            target_path,
            store_dir,
            package_name,
            package_version,
        } = options;

        let package_name = package_name.trim().to_string();
        if package_name.is_empty() {
            return Err(VicError::invalid_config("package name must not be empty"));
        }
        let version: PackageVersion = package_version.parse()?;

        if target_path.is_none() && store_dir.is_none() {
            return Err(VicError::invalid_config(format!(
                "{package_name}: either a target path or a store directory is required"
            )));
        }

        let mode = if store_dir.is_some() {
            CacheMode::Cached
        } else {
            CacheMode::Local
        };

        Ok(Self {
            cache_key_prefix: cache_key_prefix(&package_name),
            target_path,
            store_dir,
            package_name,
            version,
            mode,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            registry,
            installer,
        })
    }

    /// Override how long [`install`](Self::install) waits for another process's lock.
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub const fn version(&self) -> &PackageVersion {
        &self.version
    }

    pub const fn pinned_version(&self) -> Option<&Version> {
        self.version.pinned()
    }

    pub const fn mode(&self) -> CacheMode {
        self.mode
    }

    pub fn cache_key_prefix(&self) -> &str {
        &self.cache_key_prefix
    }

    pub fn target_path(&self) -> Option<&Path> {
        self.target_path.as_deref()
    }

    pub fn store_dir(&self) -> Option<&Path> {
        self.store_dir.as_deref()
    }

    pub const fn registry(&self) -> &R {
        &self.registry
    }

    pub const fn installer(&self) -> &I {
        &self.installer
    }

    /// Cache entry for the current version; `None` in local mode or while unpinned.
    pub fn cache_path(&self) -> Option<PathBuf> {
        self.pinned_version().and_then(|v| self.cache_path_for(v))
    }

    /// Cache entry for `version`; `None` in local mode.
    pub fn cache_path_for(&self, version: &Version) -> Option<PathBuf> {
        self.store_dir
            .as_deref()
            .map(|store| entry_path(store, &self.cache_key_prefix, version, &self.package_name))
    }

    /// Pin the version and make sure the store directory exists.
    ///
    /// Returns the pinned version. Once pinned, calling again only re-checks the
    /// store directory.
    ///
    /// # Errors
    ///
    /// [`VicError::CacheDirUnwritable`] if the store directory cannot be created,
    /// and the registry's errors when the version has to be resolved.
    pub async fn prepare(&mut self) -> Result<Version> {
        if let Some(store_dir) = &self.store_dir {
            ensure_dir(store_dir).await.map_err(|e| VicError::CacheDirUnwritable {
                path: store_dir.display().to_string(),
                reason: format!("{e:#}"),
            })?;
        }

        let version = match &self.version {
            PackageVersion::Pinned(version) => return Ok(version.clone()),
            PackageVersion::Unpinned(VersionSpec::Latest) => {
                self.registry.resolve_latest(&self.package_name).await?
            }
            PackageVersion::Unpinned(VersionSpec::Range(range)) => {
                self.registry.resolve_range(&self.package_name, range).await?
            }
        };

        debug!("Pinned {}@{} to {}", self.package_name, self.version, version);
        self.version = PackageVersion::Pinned(version.clone());
        Ok(version)
    }

    /// Whether a usable copy is already on disk. Never installs.
    ///
    /// In local mode this only checks the target path and resolves nothing.
    ///
    /// # Errors
    ///
    /// Propagates [`prepare`](Self::prepare) failures in cached mode.
    pub async fn exists(&mut self) -> Result<bool> {
        match self.mode {
            CacheMode::Local => {
                let target = self.target_path.as_deref().unwrap_or(Path::new(""));
                Ok(exists(target).await)
            }
            CacheMode::Cached => {
                let version = self.prepare().await?;
                let present = match self.cache_path_for(&version) {
                    Some(path) => is_dir(&path).await,
                    None => false,
                };
                debug!(
                    "{}@{} is {}cached",
                    self.package_name,
                    version,
                    if present { "" } else { "not " }
                );
                Ok(present)
            }
        }
    }

    /// Install the pinned version and return the directory it lives in.
    ///
    /// In cached mode the install runs under the entry's lock and is skipped if
    /// the entry appeared while waiting for it.
    ///
    /// # Errors
    ///
    /// [`VicError::InstallFailed`] wrapping the installer's error, plus any
    /// [`prepare`](Self::prepare) or lock failure.
    pub async fn install(&mut self) -> Result<PathBuf> {
        let version = self.prepare().await?;
        self.install_version(&version).await?;
        Ok(self.location_for(&version))
    }

    /// Move to the latest published version, installing it if it is missing.
    ///
    /// Older versions are left untouched in the store.
    ///
    /// # Errors
    ///
    /// Registry and installer failures as for [`install`](Self::install).
    pub async fn update(&mut self) -> Result<UpdateOutcome> {
        self.prepare().await?;
        let latest = self.registry.resolve_latest(&self.package_name).await?;

        let installed = match self.cache_path_for(&latest) {
            Some(path) => {
                if is_dir(&path).await {
                    debug!("{}@{} already cached at {}", self.package_name, latest, path.display());
                    false
                } else {
                    self.install_version(&latest).await?
                }
            }
            None => false,
        };

        if self.pinned_version() != Some(&latest) {
            info!("Updated {} to {}", self.package_name, latest);
        }
        self.version = PackageVersion::Pinned(latest.clone());

        Ok(UpdateOutcome {
            version: latest,
            installed,
        })
    }

    /// Absolute, forward-slash path of the package's entry module.
    ///
    /// Returns `Ok(None)` when there is nothing to execute: the version is not
    /// pinned yet (cached mode), no manifest is found, or it declares no `main`.
    /// In cached mode the manifest search stays inside the cache entry.
    ///
    /// # Errors
    ///
    /// [`VicError::ManifestReadFailed`] if a manifest exists but is malformed.
    pub async fn root_file_path(&self) -> Result<Option<PathBuf>> {
        let (root, ceiling) = match self.mode {
            CacheMode::Cached => match self.cache_path() {
                Some(path) => (path.clone(), Some(path)),
                None => {
                    debug!("{} is not pinned yet; no cache entry to inspect", self.package_name);
                    return Ok(None);
                }
            },
            CacheMode::Local => (self.target_path.clone().unwrap_or_default(), None),
        };

        let root = absolute_path(&root).map_err(|e| VicError::Other {
            message: format!("Failed to resolve {}: {e}", root.display()),
        })?;
        let ceiling = ceiling.map(|c| absolute_path(&c).unwrap_or(c));

        let Some(dir) = find_package_dir(&root).await else {
            debug!("No {} found from {}", MANIFEST_FILE_NAME, root.display());
            return Ok(None);
        };
        if let Some(ceiling) = &ceiling
            && !dir.starts_with(ceiling)
        {
            debug!("Ignoring {} outside cache entry: {}", MANIFEST_FILE_NAME, dir.display());
            return Ok(None);
        }

        let manifest = PackageManifest::read(&dir.join(MANIFEST_FILE_NAME)).await?;
        let Some(main) = manifest.entry_point() else {
            debug!("{} declares no entry point", dir.display());
            return Ok(None);
        };

        let entry = normalize_path(&dir.join(main));
        Ok(Some(PathBuf::from(normalize_path_for_storage(&entry))))
    }

    /// Where `version` lives after installation.
    fn location_for(&self, version: &Version) -> PathBuf {
        self.cache_path_for(version).unwrap_or_else(|| self.install_root())
    }

    fn install_root(&self) -> PathBuf {
        self.target_path.clone().or_else(|| self.store_dir.clone()).unwrap_or_default()
    }

    /// Returns whether the installer actually ran.
    async fn install_version(&self, version: &Version) -> Result<bool> {
        let (Some(store_dir), Some(entry)) = (&self.store_dir, self.cache_path_for(version)) else {
            self.run_installer(version).await?;
            return Ok(true);
        };

        let lock_name = format!("{}@{}", self.cache_key_prefix, version);
        let lock = CacheLock::acquire(store_dir, &lock_name, self.lock_timeout).await?;

        if is_dir(&entry).await {
            debug!("{}@{} was installed by another process", self.package_name, version);
            return Ok(false);
        }

        self.run_installer(version).await?;

        if !is_dir(&entry).await {
            warn!(
                "Installer reported success but {} does not exist",
                entry.display()
            );
        }
        drop(lock);

        match cleanup_stale_locks(store_dir, STALE_LOCK_TTL).await {
            Ok(0) => {}
            Ok(removed) => debug!("Pruned {removed} stale lock file(s) in {}", store_dir.display()),
            Err(e) => debug!("Skipping stale lock cleanup: {e:#}"),
        }
        Ok(true)
    }

    async fn run_installer(&self, version: &Version) -> Result<()> {
        let request = InstallRequest {
            root: self.install_root(),
            store_dir: self.store_dir.clone(),
            registry: self.registry.default_registry().clone(),
            packages: vec![PackageSpec::new(self.package_name.clone(), version.clone())],
        };

        info!("Installing {}@{} from {}", self.package_name, version, request.registry);
        self.installer.install(&request).await.map_err(|e| VicError::InstallFailed {
            name: self.package_name.clone(),
            version: version.to_string(),
            reason: format!("{e:#}"),
        })
    }
}
