//! Error handling for vic
//!
//! The error system is built around two types:
//! - [`VicError`] - Enumerated error types for every failure the package cache can report
//! - [`ErrorContext`] - Wrapper that adds user-friendly details and suggestions for the CLI
//!
//! # Error Categories
//!
//! - **Caller errors**: [`VicError::InvalidConfiguration`] fails fast at construction
//! - **File system**: [`VicError::CacheDirUnwritable`], [`VicError::CacheLockTimeout`],
//!   [`VicError::ManifestReadFailed`]
//! - **Registry**: [`VicError::RegistryUnavailable`], [`VicError::PackageNotFound`],
//!   [`VicError::VersionNotFound`]
//! - **Installation**: [`VicError::InstallFailed`]
//!
//! None of these are retried inside the library. Each variant carries the package,
//! version or path it concerns so the caller can report it without extra bookkeeping.
//!
//! # Examples
//!
//! ```rust,no_run
//! use vic_cli::core::{VicError, user_friendly_error};
//!
//! let error = VicError::PackageNotFound {
//!     name: "@vic-cli-test/init".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // colored error with a suggestion
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for package cache operations.
///
/// Variants hold plain strings rather than source errors so the type stays
/// `Clone`; the underlying cause is flattened into `reason` with its full chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VicError {
    /// The configuration record handed to the cache is unusable.
    ///
    /// Raised at construction time: missing options, a non-object options
    /// document, an empty package name or version, or an unparseable version.
    #[error("Invalid package configuration: {reason}")]
    InvalidConfiguration {
        /// What is wrong with the configuration
        reason: String,
    },

    /// The store directory could not be created or is not a directory.
    #[error("Cache directory is not writable: {path}: {reason}")]
    CacheDirUnwritable {
        /// The store directory path
        path: String,
        /// Underlying file system failure
        reason: String,
    },

    /// The registry could not be reached or returned an unusable response.
    #[error("Registry unavailable: {registry}: {reason}")]
    RegistryUnavailable {
        /// Registry base URL
        registry: String,
        /// Transport, status or decoding failure
        reason: String,
    },

    /// The registry has no published versions for the package.
    #[error("Package not found in registry: {name}")]
    PackageNotFound {
        /// Package name as requested
        name: String,
    },

    /// No published version satisfies the requested range.
    #[error("No version of {name} matches '{requirement}'")]
    VersionNotFound {
        /// Package name
        name: String,
        /// The range that matched nothing
        requirement: String,
    },

    /// The installer failed to materialize the package.
    #[error("Failed to install {name}@{version}: {reason}")]
    InstallFailed {
        /// Package name
        name: String,
        /// Concrete version that was being installed
        version: String,
        /// Installer error chain
        reason: String,
    },

    /// A package manifest exists but could not be read or parsed.
    #[error("Failed to read package manifest {path}: {reason}")]
    ManifestReadFailed {
        /// Manifest path
        path: String,
        /// I/O or JSON failure
        reason: String,
    },

    /// Another process held the install lock for too long.
    #[error("Timed out after {timeout_secs}s waiting for cache lock {path}")]
    CacheLockTimeout {
        /// Lock file path
        path: String,
        /// How long we waited
        timeout_secs: u64,
    },

    /// Catch-all for failures without a dedicated variant.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl VicError {
    /// Shorthand for [`VicError::InvalidConfiguration`].
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}

/// Error context wrapper that provides user-friendly error information.
///
/// Pairs a [`VicError`] with optional details (why it happened) and a
/// suggestion (what to do about it) for display in the terminal.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: VicError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: VicError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: error in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`].
///
/// Recognizes [`VicError`] (anywhere in the chain) and [`std::io::Error`];
/// everything else is reported as [`VicError::Other`] with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(vic_error) = error.chain().find_map(|e| e.downcast_ref::<VicError>()) {
        return create_error_context(vic_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>()
        && io_error.kind() == std::io::ErrorKind::PermissionDenied
    {
        return ErrorContext::new(VicError::Other {
            message: error.to_string(),
        })
        .with_suggestion("Check ownership and permissions of the vic home directory");
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(VicError::Other {
        message,
    })
}

fn create_error_context(error: VicError) -> ErrorContext {
    match &error {
        VicError::InvalidConfiguration {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Pass a non-empty package name and a version such as 'latest', '1.2.3' or '^1.2'"),
        VicError::CacheDirUnwritable {
            path, ..
        } => {
            let details = format!("vic keeps downloaded packages under {path}");
            ErrorContext::new(error)
                .with_details(details)
                .with_suggestion("Check disk space and permissions, or point CLI_HOME at a writable directory")
        }
        VicError::RegistryUnavailable {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check your network connection or choose another registry with --registry"),
        VicError::PackageNotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the package name, including its scope, and that the registry publishes it"),
        VicError::VersionNotFound {
            ..
        } => ErrorContext::new(error).with_suggestion("Use 'latest' or widen the version range"),
        VicError::InstallFailed {
            ..
        } => ErrorContext::new(error)
            .with_details("The installer is not retried automatically")
            .with_suggestion("Run again with --verbose to see the installer output"),
        VicError::ManifestReadFailed {
            path, ..
        } => {
            let suggestion = format!("Remove the cached entry containing {path} and run the command again");
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        VicError::CacheLockTimeout {
            ..
        } => ErrorContext::new(error)
            .with_details("Another vic process is installing the same package version")
            .with_suggestion("Wait for the other process to finish, or remove stale files under .locks/"),
        VicError::Other {
            ..
        } => ErrorContext::new(error),
    }
}
