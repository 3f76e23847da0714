//! Version requests and the pinning state machine.
//!
//! A package request starts out either pinned to a concrete semantic version or
//! unpinned (`latest` or an npm range). [`PackageVersion`] makes the transition
//! explicit: once the cache has asked the registry, the state becomes
//! [`PackageVersion::Pinned`] and never goes back.
//!
//! # Accepted Forms
//!
//! | Input | Parsed as |
//! |-------|-----------|
//! | `latest` | `Unpinned(Latest)` |
//! | `1.2.3`, `v1.2.3` | `Pinned(1.2.3)` |
//! | `^1.2`, `>=1.0.0 <2.0.0`, `1.x`, `1.2` | `Unpinned(Range(..))` |
//! | `^1 \|\| ^2`, `1.2.0 - 1.3.0` | `Unpinned(Range(..))` |
//!
//! # Range Syntax
//!
//! Ranges follow npm rules, not Cargo's. A bare partial version is an
//! x-range (`1.2` is `1.2.x`), comparators separated by whitespace must all
//! hold, `||` separates alternatives and `a - b` is an inclusive span. Each
//! alternative is translated into a [`VersionReq`]:
//!
//! | npm | `VersionReq` |
//! |-----|--------------|
//! | `1.2`, `1.2.x` | `=1.2` |
//! | `>=1.2.0 <1.3.0` | `>=1.2.0, <1.3.0` |
//! | `1.2.0 - 1.3` | `>=1.2.0, <=1.3` |
//! | `>=1.x` | `>=1` |
//!
//! Pre-releases only match an alternative that names a pre-release of the
//! same `major.minor.patch`, which is how both npm and [`VersionReq`] behave.
//!
//! # Examples
//!
//! ```rust
//! use vic_cli::version::PackageVersion;
//!
//! let v: PackageVersion = "latest".parse().unwrap();
//! assert!(!v.is_pinned());
//!
//! let v: PackageVersion = "v1.2.3".parse().unwrap();
//! assert_eq!(v.to_string(), "1.2.3");
//! ```

use crate::constants::LATEST_VERSION;
use crate::core::VicError;
use semver::{Version, VersionReq};
use std::fmt;
use std::str::FromStr;

/// An unresolved version request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    /// The registry's `latest` dist-tag.
    Latest,
    /// Highest published version satisfying the range.
    Range(VersionRange),
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str(LATEST_VERSION),
            Self::Range(range) => write!(f, "{range}"),
        }
    }
}

/// An npm version range: `||`-separated alternatives of comparator sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl VersionRange {
    /// Parse an npm range.
    ///
    /// # Errors
    ///
    /// [`VicError::InvalidConfiguration`] if any alternative is malformed.
    pub fn parse(s: &str) -> Result<Self, VicError> {
        let raw = s.trim();
        let alternatives = raw
            .split("||")
            .map(|alternative| {
                let translated = translate_alternative(alternative);
                VersionReq::parse(&translated).map_err(|e| {
                    VicError::invalid_config(format!(
                        "'{raw}' is not 'latest', a version or a version range: {e}"
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.to_string(),
            alternatives,
        })
    }

    /// Whether `version` satisfies any alternative.
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

const OPERATORS: [&str; 7] = [">=", "<=", ">", "<", "=", "^", "~"];

/// Rewrite one npm alternative as a comma-separated `VersionReq` string.
fn translate_alternative(alternative: &str) -> String {
    let alternative = alternative.trim();

    if let Some((lower, upper)) = alternative.split_once(" - ") {
        let bounds = [format!(">={}", lower.trim()), format!("<={}", upper.trim())];
        return join_comparators(bounds.iter().filter_map(|bound| translate_comparator(bound)).collect());
    }

    // operators may be written apart from their version (`>= 1.2.0`)
    let mut comparators: Vec<String> = Vec::new();
    let mut pending = String::new();
    for token in alternative.split(|c: char| c.is_whitespace() || c == ',').filter(|t| !t.is_empty()) {
        if OPERATORS.contains(&token) {
            pending.push_str(token);
            continue;
        }
        let token = format!("{}{token}", std::mem::take(&mut pending));
        if let Some(comparator) = translate_comparator(&token) {
            comparators.push(comparator);
        }
    }
    if !pending.is_empty() {
        // dangling operator; let VersionReq report it
        comparators.push(pending);
    }

    join_comparators(comparators)
}

fn join_comparators(comparators: Vec<String>) -> String {
    if comparators.is_empty() {
        "*".to_string()
    } else {
        comparators.join(", ")
    }
}

/// Translate a single comparator; `None` for one that matches everything.
fn translate_comparator(token: &str) -> Option<String> {
    let operator = OPERATORS.iter().find(|op| token.starts_with(**op)).copied().unwrap_or("");
    let version = token[operator.len()..].trim_start_matches('=');
    let version = version.strip_prefix('v').unwrap_or(version);
    let version = strip_wildcards(version);

    if version.is_empty() {
        return None;
    }
    let operator = if operator.is_empty() { "=" } else { operator };
    Some(format!("{operator}{version}"))
}

/// Drop trailing `x`/`X`/`*` components: `1.2.x` is `1.2`, `*` is empty.
fn strip_wildcards(version: &str) -> &str {
    let mut version = version;
    while let Some(rest) = ["x", "X", "*"].iter().find_map(|w| version.strip_suffix(w)) {
        match rest.strip_suffix('.') {
            Some(rest) => version = rest,
            None if rest.is_empty() => return rest,
            None => break,
        }
    }
    version
}

/// Version state of a package request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageVersion {
    /// Not yet resolved against the registry.
    Unpinned(VersionSpec),
    /// Resolved to exactly one published version.
    Pinned(Version),
}

impl PackageVersion {
    /// Returns `true` once the version names exactly one release.
    pub const fn is_pinned(&self) -> bool {
        matches!(self, Self::Pinned(_))
    }

    /// The concrete version, if pinned.
    pub const fn pinned(&self) -> Option<&Version> {
        match self {
            Self::Pinned(version) => Some(version),
            Self::Unpinned(_) => None,
        }
    }
}

impl FromStr for PackageVersion {
    type Err = VicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(VicError::invalid_config("package version must not be empty"));
        }

        if trimmed.eq_ignore_ascii_case(LATEST_VERSION) {
            return Ok(Self::Unpinned(VersionSpec::Latest));
        }

        if let Ok(version) = parse_version(trimmed) {
            return Ok(Self::Pinned(version));
        }

        VersionRange::parse(trimmed).map(|range| Self::Unpinned(VersionSpec::Range(range)))
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unpinned(spec) => write!(f, "{spec}"),
            Self::Pinned(version) => write!(f, "{version}"),
        }
    }
}

/// Parse a concrete version, accepting a leading `v`.
pub fn parse_version(s: &str) -> Result<Version, semver::Error> {
    let clean = s.strip_prefix('v').unwrap_or(s);
    Version::parse(clean)
}

/// Highest version in `versions` that satisfies `range`.
pub fn max_satisfying<'a, I>(versions: I, range: &VersionRange) -> Option<Version>
where
    I: IntoIterator<Item = &'a Version>,
{
    versions.into_iter().filter(|v| range.matches(v)).max().cloned()
}

/// Highest stable version, falling back to the highest pre-release.
pub fn max_version<'a, I>(versions: I) -> Option<Version>
where
    I: IntoIterator<Item = &'a Version>,
{
    let all: Vec<&Version> = versions.into_iter().collect();
    all.iter().filter(|v| v.pre.is_empty()).max().or_else(|| all.iter().max()).map(|v| (*v).clone())
}

/// Versions strictly newer than `current`, newest first.
///
/// Pre-releases are only offered to a `current` that is itself a pre-release.
pub fn newer_versions<'a, I>(current: &Version, versions: I) -> Vec<Version>
where
    I: IntoIterator<Item = &'a Version>,
{
    let include_pre = !current.pre.is_empty();
    let mut newer: Vec<Version> = versions
        .into_iter()
        .filter(|v| *v > current && (include_pre || v.pre.is_empty()))
        .cloned()
        .collect();
    newer.sort_by(|a, b| b.cmp(a));
    newer
}
