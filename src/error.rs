//! Error types for loader operations.
//!
//! Every error surfaces directly to the caller: the loader performs no local
//! recovery or retry. Use [`Error::category()`] to decide how to respond:
//!
//! - [`ErrorCategory::Authentication`] - fix credentials (`UNSTRUCTURED_API_KEY`
//!   unset, expired, or rejected by the partition API). Not a code bug.
//! - [`ErrorCategory::Network`] - transient infrastructure issue; a caller-side
//!   retry with backoff is reasonable.
//! - [`ErrorCategory::Validation`] - bad input (missing file, unreachable URL,
//!   conflicting configuration). Fix the input.
//! - [`ErrorCategory::Engine`] - the partitioning engine failed; propagated
//!   opaquely with whatever detail the engine returned.

use thiserror::Error;

/// Result type alias for loader operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error category for systematic error handling.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid or missing credentials for the remote partition API.
    Authentication,
    /// Network/infrastructure issues (timeouts, connection refused).
    Network,
    /// Bad user input (missing files, unreachable URLs, bad configuration).
    Validation,
    /// Partitioning engine failure, local or remote.
    Engine,
    /// Other/unknown errors.
    Unknown,
}

impl ErrorCategory {
    /// Human-readable description of the category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "Authentication/Authorization Issue",
            ErrorCategory::Network => "Network/Infrastructure Issue",
            ErrorCategory::Validation => "Validation Error",
            ErrorCategory::Engine => "Partitioning Engine Failure",
            ErrorCategory::Unknown => "Unknown Error",
        }
    }
}

/// Errors produced while loading and normalizing documents.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// A file path does not exist or is unreadable, or a URL is unreachable.
    #[error("source not found: {0}")]
    SourceNotFound(String),

    /// Missing or invalid API key for remote partitioning.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The partitioning engine failed; the message carries whatever detail
    /// the engine returned.
    #[error("partitioning engine error: {0}")]
    Engine(String),

    /// Invalid input or configuration.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// HTTP transport failure while talking to the remote engine.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Filesystem I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to (de)serialize an engine payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Categorize this error for systematic handling.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Authentication(_) => ErrorCategory::Authentication,
            Error::Network(_) => ErrorCategory::Network,
            Error::SourceNotFound(_) | Error::InvalidInput(_) => ErrorCategory::Validation,
            Error::Engine(_) => ErrorCategory::Engine,
            Error::Io(_) | Error::Serialization(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether a caller-side retry is reasonable for this error.
    ///
    /// Only network failures are considered transient; everything else needs
    /// the input or configuration fixed first.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Network)
    }
}
