//! Core types for gbif-dl

use crate::error::ErrorCategory;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// One catalog entry describing a dataset and its access endpoints
///
/// Only the fields the downloader needs are typed; everything else the API
/// returns is kept in `extra` so records can be written back out unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    /// Unique dataset identifier
    #[serde(default)]
    pub key: Option<String>,

    /// Display title
    #[serde(default)]
    pub title: Option<String>,

    /// Access endpoints, in catalog order
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,

    /// Remaining metadata fields
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DatasetRecord {
    /// Non-empty dataset key, if present
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    /// Title safe to use in messages and file names
    pub fn display_title(&self) -> String {
        self.title
            .as_deref()
            .unwrap_or("unknown_title")
            .replace('/', "_")
    }

    /// First endpoint tagged with `endpoint_type` that carries a non-blank URL
    pub fn archive_endpoint(&self, endpoint_type: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| {
            e.endpoint_type == endpoint_type
                && e.url.as_deref().is_some_and(|url| !url.trim().is_empty())
        })
    }
}

/// Metadata identifying how and where to fetch a dataset's data
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Format tag, e.g. "DWC_ARCHIVE" or "EML"
    #[serde(rename = "type", default)]
    pub endpoint_type: String,

    /// Where the data lives
    #[serde(default)]
    pub url: Option<String>,
}

/// One page of catalog search results
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPage {
    /// Offset the server applied
    #[serde(default)]
    pub offset: u64,

    /// Page size the server applied
    #[serde(default)]
    pub limit: u64,

    /// Whether this is the last page; treated as true when absent
    #[serde(default = "default_end_of_records")]
    pub end_of_records: bool,

    /// Total number of matching records, when reported
    #[serde(default)]
    pub count: Option<u64>,

    /// Records on this page
    #[serde(default)]
    pub results: Vec<DatasetRecord>,
}

fn default_end_of_records() -> bool {
    true
}

/// Resolved archive location for one dataset
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadTarget {
    /// Dataset key the archive belongs to
    pub dataset_key: String,
    /// Archive URL
    pub url: Url,
    /// Final file path (`<key>.<extension>` in the download directory)
    pub path: PathBuf,
}

impl DownloadTarget {
    /// Path the body is streamed to before the final rename
    pub fn partial_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".part");
        PathBuf::from(name)
    }
}

/// Why a dataset was not downloaded
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The record has no key
    MissingKey,
    /// The key cannot be used as a file name
    InvalidKey,
    /// An earlier record in the same run had the same key
    DuplicateKey,
    /// No endpoint of the archive type
    NoArchiveEndpoint,
    /// The detail lookup returned 404
    DetailNotFound,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            SkipReason::MissingKey => "dataset has no key",
            SkipReason::InvalidKey => "dataset key is not a valid file name",
            SkipReason::DuplicateKey => "dataset key already processed in this run",
            SkipReason::NoArchiveEndpoint => "no archive download link found",
            SkipReason::DetailNotFound => "dataset details not found",
        };
        f.write_str(msg)
    }
}

/// Result of processing one dataset
#[derive(Clone, Debug, PartialEq)]
pub enum DownloadOutcome {
    /// The archive was written completely
    Downloaded {
        /// Dataset key
        dataset_key: String,
        /// Archive path on disk
        path: PathBuf,
        /// Bytes written
        bytes: u64,
    },
    /// Nothing was attempted for a known reason
    Skipped {
        /// Dataset key, when the record had one
        dataset_key: Option<String>,
        /// Why it was skipped
        reason: SkipReason,
    },
    /// The download was attempted and failed
    Failed {
        /// Dataset key
        dataset_key: String,
        /// Error message
        error: String,
        /// Error classification
        category: ErrorCategory,
    },
}

impl DownloadOutcome {
    /// Whether an archive was written
    pub fn is_downloaded(&self) -> bool {
        matches!(self, DownloadOutcome::Downloaded { .. })
    }
}

/// Summary of a batch of dataset downloads
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchReport {
    /// Outcome per record, in input order
    pub outcomes: Vec<DownloadOutcome>,
}

impl BatchReport {
    /// Number of archives written
    pub fn downloaded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_downloaded()).count()
    }

    /// Number of skipped records
    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DownloadOutcome::Skipped { .. }))
            .count()
    }

    /// Number of failed downloads
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DownloadOutcome::Failed { .. }))
            .count()
    }

    /// Total bytes written
    pub fn total_bytes(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|o| match o {
                DownloadOutcome::Downloaded { bytes, .. } => *bytes,
                _ => 0,
            })
            .sum()
    }
}

/// A per-item failure recorded in a batch report
#[derive(Clone, Debug, PartialEq)]
pub struct ItemFailure {
    /// File the failure concerns
    pub path: PathBuf,
    /// Error message
    pub error: String,
    /// Error classification
    pub category: ErrorCategory,
}

/// Summary of an extraction run
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtractionReport {
    /// Output directories of successfully extracted archives
    pub extracted: Vec<PathBuf>,
    /// Archives that failed; they are left on disk
    pub failed: Vec<ItemFailure>,
    /// Extracted archives that could not be removed afterwards
    pub cleanup_warnings: Vec<ItemFailure>,
}

impl ExtractionReport {
    /// Whether no archive was found at all
    pub fn is_empty(&self) -> bool {
        self.extracted.is_empty() && self.failed.is_empty()
    }
}

/// Summary of a conversion run
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConversionReport {
    /// Files written, with the number of rows each holds
    pub converted: Vec<(PathBuf, u64)>,
    /// Source files that could not be converted
    pub failed: Vec<ItemFailure>,
}

impl ConversionReport {
    /// Total rows written across all files
    pub fn total_rows(&self) -> u64 {
        self.converted.iter().map(|(_, rows)| rows).sum()
    }
}
