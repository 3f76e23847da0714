//! Registry lookups: turning a package name into concrete versions.
//!
//! The cache only needs three answers from a registry: which versions exist,
//! which one is `latest`, and where the registry lives (so the installer can be
//! pointed at the same place). [`RegistryClient`] captures exactly that, and
//! [`NpmRegistry`] implements it against an npm-compatible HTTP registry.
//!
//! # Package Documents
//!
//! `NpmRegistry` issues one request per lookup:
//!
//! ```text
//! GET {registry}/{name}        (scoped names are sent as @scope%2fname)
//! Accept: application/vnd.npm.install-v1+json
//! ```
//!
//! and reads the `dist-tags.latest` and `versions` keys of the response.

use crate::constants::{
    DEFAULT_REGISTRY, REGISTRY_CONNECT_TIMEOUT, REGISTRY_REQUEST_TIMEOUT,
};
use crate::core::{Result, VicError};
use crate::version::{VersionRange, max_satisfying, max_version, parse_version};
use async_trait::async_trait;
use reqwest::StatusCode;
use semver::Version;
use serde::Deserialize;
use serde::de::IgnoredAny;
use std::collections::HashMap;
use tracing::debug;
use url::Url;

/// Version lookups against a package registry.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Base URL of the registry, handed to the installer.
    fn default_registry(&self) -> &Url;

    /// All published versions of `name`, in no particular order.
    ///
    /// # Errors
    ///
    /// [`VicError::PackageNotFound`] if the registry does not know the package,
    /// [`VicError::RegistryUnavailable`] for transport or decoding failures.
    async fn versions(&self, name: &str) -> Result<Vec<Version>>;

    /// The version the registry currently advertises as latest.
    ///
    /// # Errors
    ///
    /// As [`versions`](Self::versions); a package without any published version
    /// is [`VicError::PackageNotFound`].
    async fn resolve_latest(&self, name: &str) -> Result<Version>;

    /// Highest published version satisfying `range`.
    ///
    /// # Errors
    ///
    /// [`VicError::VersionNotFound`] if nothing matches, otherwise as
    /// [`versions`](Self::versions).
    async fn resolve_range(&self, name: &str, range: &VersionRange) -> Result<Version> {
        let versions = self.versions(name).await?;
        if versions.is_empty() {
            return Err(VicError::PackageNotFound {
                name: name.to_string(),
            });
        }
        max_satisfying(&versions, range).ok_or_else(|| VicError::VersionNotFound {
            name: name.to_string(),
            requirement: range.to_string(),
        })
    }
}

/// Package document as served by npm-compatible registries.
#[derive(Debug, Deserialize)]
struct PackageDocument {
    #[serde(rename = "dist-tags", default)]
    dist_tags: HashMap<String, String>,
    #[serde(default)]
    versions: HashMap<String, IgnoredAny>,
}

impl PackageDocument {
    fn parsed_versions(&self) -> Vec<Version> {
        self.versions.keys().filter_map(|v| parse_version(v).ok()).collect()
    }
}

/// HTTP client for npm-compatible registries.
#[derive(Debug, Clone)]
pub struct NpmRegistry {
    client: reqwest::Client,
    registry: Url,
}

impl NpmRegistry {
    /// Client for the public npm registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_url(DEFAULT_REGISTRY)
    }

    /// Client for a custom registry base URL.
    ///
    /// # Errors
    ///
    /// [`VicError::InvalidConfiguration`] if `registry` is not an absolute
    /// http(s) URL, [`VicError::Other`] if the HTTP client cannot be built.
    pub fn with_url(registry: &str) -> Result<Self> {
        let mut url = Url::parse(registry).map_err(|e| {
            VicError::invalid_config(format!("invalid registry URL '{registry}': {e}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(VicError::invalid_config(format!(
                "registry URL must use http or https: {registry}"
            )));
        }
        // join() drops the last segment unless the base ends with a slash
        if !url.path().ends_with('/') {
            url.set_path(&format!("{}/", url.path()));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(REGISTRY_CONNECT_TIMEOUT)
            .timeout(REGISTRY_REQUEST_TIMEOUT)
            .user_agent(format!("vic-cli/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VicError::Other {
                message: format!("Failed to build registry HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            registry: url,
        })
    }

    /// URL of the package document for `name`.
    ///
    /// # Errors
    ///
    /// [`VicError::InvalidConfiguration`] if the name cannot form a URL path.
    pub fn package_url(&self, name: &str) -> Result<Url> {
        self.registry
            .join(&encode_package_name(name))
            .map_err(|e| VicError::invalid_config(format!("invalid package name '{name}': {e}")))
    }

    fn unavailable(&self, reason: impl Into<String>) -> VicError {
        VicError::RegistryUnavailable {
            registry: self.registry.to_string(),
            reason: reason.into(),
        }
    }

    async fn fetch_document(&self, name: &str) -> Result<PackageDocument> {
        let url = self.package_url(name)?;
        debug!("Fetching package document {}", url);

        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/vnd.npm.install-v1+json")
            .send()
            .await
            .map_err(|e| self.unavailable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(VicError::PackageNotFound {
                name: name.to_string(),
            });
        }
        if !status.is_success() {
            return Err(self.unavailable(format!("GET {url} returned HTTP {status}")));
        }

        response
            .json::<PackageDocument>()
            .await
            .map_err(|e| self.unavailable(format!("invalid package document for {name}: {e}")))
    }
}

#[async_trait]
impl RegistryClient for NpmRegistry {
    fn default_registry(&self) -> &Url {
        &self.registry
    }

    async fn versions(&self, name: &str) -> Result<Vec<Version>> {
        Ok(self.fetch_document(name).await?.parsed_versions())
    }

    async fn resolve_latest(&self, name: &str) -> Result<Version> {
        let document = self.fetch_document(name).await?;

        if let Some(latest) = document.dist_tags.get("latest") {
            match parse_version(latest) {
                Ok(version) => {
                    debug!("{} latest dist-tag is {}", name, version);
                    return Ok(version);
                }
                Err(e) => debug!("Ignoring unparseable latest dist-tag '{}' for {}: {}", latest, name, e),
            }
        }

        max_version(&document.parsed_versions()).ok_or_else(|| VicError::PackageNotFound {
            name: name.to_string(),
        })
    }
}

/// Encode a package name as a single registry path segment.
///
/// Scoped names keep their `@` but the separator is percent-encoded, which is
/// what npm registries expect.
pub fn encode_package_name(name: &str) -> String {
    name.replace('/', "%2f")
}
