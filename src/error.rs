//! Error types for gbif-dl
//!
//! This module provides the error handling for the library, including:
//! - The crate-wide [`Error`] type with contextual information (URL, archive path, config key)
//! - Archive-specific errors ([`ArchiveError`])
//! - Classification into the categories reported to the user ([`ErrorCategory`])

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for gbif-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for gbif-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api.page_size")
        key: Option<String>,
    },

    /// Invalid user input (empty publisher identifier, malformed URL, etc.)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The catalog reported the publisher as unknown
    #[error("organization with identifier '{0}' not found")]
    PublisherNotFound(String),

    /// Remote service answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// HTTP status code returned by the server
        status: u16,
        /// The URL that was requested
        url: String,
    },

    /// Network error (connection, timeout, body decoding)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Delimited text read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Archive extraction error
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Archive extraction errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The file is not a readable archive; it is left in place for inspection
    #[error("bad archive {archive}: {reason}")]
    Corrupt {
        /// The archive that could not be opened
        archive: PathBuf,
        /// The reason the archive was rejected
        reason: String,
    },

    /// Extraction started but did not complete
    #[error("extraction failed for {archive}: {reason}")]
    ExtractionFailed {
        /// The archive file that failed to extract
        archive: PathBuf,
        /// The reason extraction failed
        reason: String,
    },
}

/// Coarse classification of failures, used when reporting to the user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Empty or unknown identifiers, bad configuration
    InvalidInput,
    /// Timeouts, connection resets, 5xx responses
    Transient,
    /// 404s and datasets without a usable archive
    MissingResource,
    /// Unreadable local data such as a corrupt archive
    CorruptData,
    /// Local filesystem failures
    Filesystem,
    /// Anything else
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCategory::InvalidInput => "invalid_input",
            ErrorCategory::Transient => "transient",
            ErrorCategory::MissingResource => "missing_resource",
            ErrorCategory::CorruptData => "corrupt_data",
            ErrorCategory::Filesystem => "filesystem",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Build a configuration error for the given key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether this error means the requested remote resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::PublisherNotFound(_)) || self.status() == Some(404)
    }

    /// Classify the error into the category shown to the user
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config { .. } | Error::InvalidInput(_) => ErrorCategory::InvalidInput,
            Error::PublisherNotFound(_) => ErrorCategory::InvalidInput,
            Error::HttpStatus { status: 404, .. } => ErrorCategory::MissingResource,
            Error::HttpStatus { status, .. } if *status >= 500 || *status == 429 => {
                ErrorCategory::Transient
            }
            Error::HttpStatus { .. } => ErrorCategory::Internal,
            Error::Network(e) => {
                if e.status().map(|s| s.as_u16()) == Some(404) {
                    ErrorCategory::MissingResource
                } else if e.is_decode() {
                    ErrorCategory::Internal
                } else {
                    ErrorCategory::Transient
                }
            }
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::TimedOut
                | std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::UnexpectedEof => ErrorCategory::Transient,
                _ => ErrorCategory::Filesystem,
            },
            Error::Serialization(_) => ErrorCategory::Internal,
            Error::Csv(e) => match e.kind() {
                csv::ErrorKind::Io(_) => ErrorCategory::Filesystem,
                _ => ErrorCategory::CorruptData,
            },
            Error::Archive(ArchiveError::Corrupt { .. }) => ErrorCategory::CorruptData,
            Error::Archive(ArchiveError::ExtractionFailed { .. }) => ErrorCategory::Filesystem,
            Error::Other(_) => ErrorCategory::Internal,
        }
    }
}
