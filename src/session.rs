//! End-to-end download session
//!
//! Publisher prompt, catalog fetch, per-dataset downloads and the optional
//! extraction step, in that order.

use crate::catalog::CatalogFetcher;
use crate::config::Config;
use crate::downloader::ArchiveDownloader;
use crate::error::{Error, Result};
use crate::extraction::ArchiveExtractor;
use crate::http::{Fetcher, HttpFetcher};
use crate::progress::ProgressReporter;
use crate::prompt::{InputProvider, ask_publisher, ask_yes_no};
use crate::types::{BatchReport, ExtractionReport};
use std::sync::Arc;
use tracing::info;

/// Answers supplied up front; `None` means "ask"
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Publisher identifier
    pub publisher: Option<String>,
    /// Whether to extract the downloaded archives
    pub extract: Option<bool>,
}

/// What a session did
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    /// Publisher whose catalog was processed
    pub publisher: String,
    /// Number of dataset records in the catalog
    pub datasets_found: usize,
    /// Per-dataset download outcomes
    pub downloads: BatchReport,
    /// Extraction results, if extraction ran
    pub extraction: Option<ExtractionReport>,
}

/// Ties the catalog fetcher, downloader and extractor together
pub struct Session {
    config: Config,
    catalog: CatalogFetcher,
    downloader: ArchiveDownloader,
    extractor: ArchiveExtractor,
}

impl Session {
    /// Build a session over the given network access
    pub fn new(config: Config, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        config.validate()?;
        let catalog = CatalogFetcher::new(fetcher.clone(), config.api.clone());
        let downloader =
            ArchiveDownloader::new(fetcher, config.api.clone(), config.download.clone());
        let extractor = ArchiveExtractor::new(config.download.archive_extension.clone());
        Ok(Self {
            config,
            catalog,
            downloader,
            extractor,
        })
    }

    /// Build a session that talks to the configured API over HTTP
    pub fn with_http(config: Config) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config.api)?);
        Self::new(config, fetcher)
    }

    /// Run the whole pipeline
    ///
    /// Invalid input and catalog failures end the session with an error before
    /// anything is downloaded; per-dataset and per-archive failures are only
    /// recorded in the summary.
    pub async fn run(
        &self,
        input: &mut dyn InputProvider,
        options: RunOptions,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunSummary> {
        let publisher = match options.publisher {
            Some(p) if !p.trim().is_empty() => p.trim().to_string(),
            Some(_) => {
                return Err(Error::InvalidInput(
                    "publisher UUID cannot be empty".to_string(),
                ));
            }
            None => ask_publisher(input)?,
        };

        let download_dir = self.config.download.download_dir.clone();
        if !download_dir.exists() {
            tokio::fs::create_dir_all(&download_dir).await?;
            info!(dir = ?download_dir, "created download directory");
        }

        let datasets = self.catalog.fetch_all(&publisher).await?;
        let mut summary = RunSummary {
            publisher,
            datasets_found: datasets.len(),
            ..Default::default()
        };
        if datasets.is_empty() {
            info!("no datasets found to download");
            return Ok(summary);
        }

        info!(
            total = datasets.len(),
            "found a total of {} datasets, starting downloads",
            datasets.len()
        );
        summary.downloads = self
            .downloader
            .download_all(&datasets, &download_dir, reporter)
            .await;

        let extract = match options.extract {
            Some(extract) => extract,
            None => ask_yes_no(
                input,
                "Unzip all downloaded archives and delete the original zips? [y/N]",
            )?,
        };
        if extract {
            let extractor = self.extractor.clone();
            let dir = download_dir.clone();
            let report = tokio::task::spawn_blocking(move || extractor.extract_all(&dir))
                .await
                .map_err(|e| Error::Other(format!("extraction task panicked: {}", e)))??;
            summary.extraction = Some(report);
        } else {
            info!("skipping unzip step");
        }

        info!(dir = ?download_dir, "all tasks are complete");
        Ok(summary)
    }
}
