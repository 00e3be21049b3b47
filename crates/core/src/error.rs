//! Error types for the release acquisition pipeline.

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::install::CopyFailure;

/// Result type alias for fetcher operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while tapping, resolving, downloading or installing.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// A repository URL or other user input could not be parsed.
    #[error("Invalid input '{input}': {message}")]
    #[diagnostic(
        code(fetcher::parse),
        help("Repository URLs look like https://github.com/owner/repo")
    )]
    Parse {
        /// The offending input
        input: String,
        /// What was wrong with it
        message: String,
    },

    /// No registered provider handles the repository's host.
    #[error("Unsupported Git service provider for '{url}'")]
    #[diagnostic(
        code(fetcher::provider::unsupported),
        help("Only repositories on a registered host can be fetched")
    )]
    UnsupportedProvider {
        /// The repository URL
        url: String,
    },

    /// A provider with the same name was already registered.
    #[error("Provider '{name}' is already registered")]
    #[diagnostic(code(fetcher::provider::duplicate))]
    DuplicateProvider {
        /// The provider name
        name: String,
    },

    /// No tapped repository matches the given name or URL.
    #[error("Repository not found: {name}")]
    #[diagnostic(
        code(fetcher::repository::not_found),
        help("Run 'fetcher list' to see tapped repositories, or 'fetcher tap <url>' to add one")
    )]
    RepositoryNotFound {
        /// The name or URL that was looked up
        name: String,
    },

    /// The repository has already been tapped.
    #[error("Repository already exists: {url}")]
    #[diagnostic(code(fetcher::repository::duplicate))]
    Duplicate {
        /// The repository URL
        url: String,
    },

    /// No asset of the release matches the current platform.
    #[error("No asset matches platform {platform}. Available: {available:?}")]
    #[diagnostic(
        code(fetcher::release::no_match),
        help("Use 'fetcher download' to fetch every asset of the release")
    )]
    NoMatchingAsset {
        /// The platform tag that was matched against
        platform: String,
        /// Names of every asset in the release
        available: Vec<String>,
    },

    /// The request to the provider failed before a response was received.
    #[error("{provider} request failed: {message}")]
    #[diagnostic(code(fetcher::provider::request))]
    ProviderRequest {
        /// The provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// The provider answered with a non-success status.
    #[error("{provider} responded with HTTP {status}: {reason}")]
    #[diagnostic(
        code(fetcher::provider::response),
        help("Check the repository URL and that the token has access to its releases")
    )]
    ProviderResponse {
        /// The provider name
        provider: String,
        /// HTTP status code
        status: u16,
        /// Short reason from the response
        reason: String,
    },

    /// The archive suffix is not one of the supported formats.
    #[error("Unsupported archive format: {}", path.display())]
    #[diagnostic(
        code(fetcher::extract::unsupported_format),
        help("Supported formats are .tar.gz, .tgz and .zip")
    )]
    UnsupportedFormat {
        /// The archive path
        path: PathBuf,
    },

    /// The archive could not be decoded.
    #[error("Failed to extract {}: {message}", path.display())]
    #[diagnostic(code(fetcher::extract::failed))]
    Extraction {
        /// The archive path
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// An archive entry or asset name would be written outside its target directory.
    #[error("Refusing to write '{entry}' outside of the destination directory")]
    #[diagnostic(code(fetcher::extract::unsafe_entry))]
    UnsafeArchiveEntry {
        /// The entry name as recorded in the archive
        entry: String,
    },

    /// The scratch directory could not be created.
    #[error("Failed to create scratch directory {}: {source}", path.display())]
    #[diagnostic(
        code(fetcher::install::scratch_dir),
        help("A previous install may have left the directory behind; remove it and retry")
    )]
    ScratchDir {
        /// The scratch directory path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Some entries could not be copied into the install destination.
    #[error("Failed to copy {} entries into the install destination", failures.len())]
    #[diagnostic(code(fetcher::install::copy))]
    Copy {
        /// Every entry that failed
        failures: Vec<CopyFailure>,
    },

    /// The install destination could not be determined.
    #[error("Install destination unavailable: {message}")]
    #[diagnostic(
        code(fetcher::install::destination),
        help("Pass --install-dir or set FETCHER_INSTALL_DIR")
    )]
    Destination {
        /// Error message
        message: String,
    },

    /// The persisted repository registry is unreadable.
    #[error("Corrupt registry state in {}: {message}", path.display())]
    #[diagnostic(
        code(fetcher::registry::corrupt),
        help("Fix or remove the registry file; it must be a JSON document with a 'repositories' list")
    )]
    CorruptState {
        /// The registry file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// A filesystem operation failed.
    #[error("I/O error during {operation}{}: {source}", path.as_ref().map(|p| format!(" on {}", p.display())).unwrap_or_default())]
    #[diagnostic(code(fetcher::io))]
    Io {
        /// The operation being performed
        operation: String,
        /// The path involved, if any
        path: Option<PathBuf>,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a parse error.
    #[must_use]
    pub fn parse(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Create a provider request error.
    #[must_use]
    pub fn provider_request(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderRequest {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a provider response error.
    #[must_use]
    pub fn provider_response(
        provider: impl Into<String>,
        status: u16,
        reason: impl Into<String>,
    ) -> Self {
        Self::ProviderResponse {
            provider: provider.into(),
            status,
            reason: reason.into(),
        }
    }

    /// Create an extraction error.
    #[must_use]
    pub fn extraction(path: &Path, message: impl Into<String>) -> Self {
        Self::Extraction {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Create a corrupt state error.
    #[must_use]
    pub fn corrupt_state(path: &Path, message: impl Into<String>) -> Self {
        Self::CorruptState {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Create a destination error.
    #[must_use]
    pub fn destination(message: impl Into<String>) -> Self {
        Self::Destination {
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the operation and path it came from.
    #[must_use]
    pub fn io(operation: impl Into<String>, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: Some(path.to_path_buf()),
            source,
        }
    }
}
