//! # gbif-dl
//!
//! Bulk retrieval of a GBIF publisher's datasets, plus normalization of the
//! extracted tabular files.
//!
//! The pipeline:
//! - [`catalog`] pages through the dataset search endpoint for one publisher
//! - [`downloader`] resolves each dataset's Darwin Core Archive and streams it to disk
//! - [`extraction`] unpacks every downloaded archive into its own directory
//! - [`convert`] rewrites tab-separated data files as comma-separated files
//!
//! Network access goes through the [`Fetcher`] trait and user input through
//! [`InputProvider`], so every component can be driven without a network or a terminal.
//!
//! ## Quick Start
//!
//! ```no_run
//! use gbif_dl::{Config, NoProgress, RunOptions, Session, TerminalInput};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::with_http(Config::default())?;
//!     let options = RunOptions {
//!         publisher: Some("b351a324-872b-47c5-a476-c08b28f73e73".to_string()),
//!         extract: Some(true),
//!     };
//!     let summary = session.run(&mut TerminalInput, options, &NoProgress).await?;
//!     println!("downloaded {} archives", summary.downloads.downloaded());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Publisher catalog paging
pub mod catalog;
/// Configuration types
pub mod config;
/// Delimited text conversion
pub mod convert;
/// Dataset archive downloads
pub mod downloader;
/// Error types
pub mod error;
/// Archive extraction
pub mod extraction;
/// HTTP fetch interface
pub mod http;
/// Download progress events
pub mod progress;
/// User prompts
pub mod prompt;
/// End-to-end download session
pub mod session;
/// Core types
pub mod types;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod test_helpers;

// Re-export commonly used types
pub use catalog::CatalogFetcher;
pub use config::{ApiConfig, Config, ConvertConfig, DownloadConfig};
pub use convert::FormatConverter;
pub use downloader::ArchiveDownloader;
pub use error::{ArchiveError, Error, ErrorCategory, Result};
pub use extraction::ArchiveExtractor;
pub use http::{FetchResponse, Fetcher, HttpFetcher};
pub use progress::{NoProgress, ProgressEvent, ProgressReporter};
pub use prompt::{InputProvider, ScriptedInput, TerminalInput};
pub use session::{RunOptions, RunSummary, Session};
pub use types::{
    BatchReport, CatalogPage, ConversionReport, DatasetRecord, DownloadOutcome, DownloadTarget,
    Endpoint, ExtractionReport, ItemFailure, SkipReason,
};
