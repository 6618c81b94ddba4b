//! Dataset archive downloads
//!
//! For each dataset record: look up its details, pick the first endpoint of the
//! archive type, and stream the archive to `<key>.<extension>` in fixed-size
//! chunks. A failure only affects the dataset it happened on.

use crate::config::{ApiConfig, DownloadConfig};
use crate::error::{Error, Result};
use crate::http::Fetcher;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::types::{BatchReport, DatasetRecord, DownloadOutcome, DownloadTarget, SkipReason};
use futures::StreamExt;
use std::collections::HashSet;
use std::path::{Component, Path};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

/// Downloads the primary data archive of dataset records
pub struct ArchiveDownloader {
    fetcher: Arc<dyn Fetcher>,
    api: ApiConfig,
    config: DownloadConfig,
}

/// Whether `key` can be used verbatim as a single file name component
pub fn is_safe_key(key: &str) -> bool {
    if key.contains(['/', '\\', '\0']) {
        return false;
    }
    let mut components = Path::new(key).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

impl ArchiveDownloader {
    /// Create a downloader using the given network access and settings
    pub fn new(fetcher: Arc<dyn Fetcher>, api: ApiConfig, config: DownloadConfig) -> Self {
        Self {
            fetcher,
            api,
            config,
        }
    }

    /// Look up the dataset's details and resolve where its archive lives
    ///
    /// Returns `Ok(None)` when the dataset has no endpoint of the archive type.
    pub async fn resolve_target(
        &self,
        dataset_key: &str,
        dest_dir: &Path,
    ) -> Result<Option<DownloadTarget>> {
        debug!(dataset_key, "getting dataset details");
        let url = self.api.dataset_url(dataset_key)?;
        let details: DatasetRecord = self.fetcher.get(&url).await?.error_for_status()?.json().await?;

        let Some(endpoint) = details.archive_endpoint(&self.config.archive_endpoint_type) else {
            return Ok(None);
        };
        let raw_url = endpoint.url.as_deref().unwrap_or_default();
        let url = Url::parse(raw_url).map_err(|e| {
            Error::InvalidInput(format!("invalid archive URL '{}': {}", raw_url, e))
        })?;

        Ok(Some(DownloadTarget {
            dataset_key: dataset_key.to_string(),
            url,
            path: dest_dir.join(format!(
                "{}.{}",
                dataset_key, self.config.archive_extension
            )),
        }))
    }

    /// Stream the archive to disk, writing exactly `chunk_size` bytes at a time
    ///
    /// The body goes to a `.part` file that is renamed into place once complete;
    /// on any failure the partial file is removed. Returns the number of bytes written.
    pub async fn stream_to_file(
        &self,
        target: &DownloadTarget,
        reporter: &dyn ProgressReporter,
    ) -> Result<u64> {
        let partial = target.partial_path();
        match self.stream_to_partial(target, &partial, reporter).await {
            Ok(written) => {
                tokio::fs::rename(&partial, &target.path).await?;
                Ok(written)
            }
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(&partial).await
                    && remove_err.kind() != std::io::ErrorKind::NotFound
                {
                    warn!(path = ?partial, error = %remove_err, "could not remove partial download");
                }
                Err(e)
            }
        }
    }

    async fn stream_to_partial(
        &self,
        target: &DownloadTarget,
        partial: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<u64> {
        let response = self.fetcher.get(&target.url).await?.error_for_status()?;
        let total = response.content_length;

        if let Some(parent) = partial.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(partial).await?;

        info!(dataset_key = %target.dataset_key, path = ?target.path, ?total, "downloading archive");
        reporter.report(ProgressEvent::DownloadStarted {
            dataset_key: target.dataset_key.clone(),
            total,
        });

        let chunk_size = self.config.chunk_size.max(1);
        let mut buffer: Vec<u8> = Vec::with_capacity(chunk_size);
        let mut written: u64 = 0;
        let mut body = response.body;

        while let Some(piece) = body.next().await {
            let piece = piece?;
            let mut rest = piece.as_slice();
            while !rest.is_empty() {
                let take = (chunk_size - buffer.len()).min(rest.len());
                buffer.extend_from_slice(&rest[..take]);
                rest = &rest[take..];
                if buffer.len() == chunk_size {
                    written += write_chunk(&mut file, &buffer).await?;
                    buffer.clear();
                    report_chunk(reporter, target, written, total);
                }
            }
        }
        if !buffer.is_empty() {
            written += write_chunk(&mut file, &buffer).await?;
            report_chunk(reporter, target, written, total);
        }
        file.flush().await?;

        if let Some(expected) = total
            && expected != written
        {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "archive for {} ended after {} of {} bytes",
                    target.dataset_key, written, expected
                ),
            )));
        }

        reporter.report(ProgressEvent::DownloadFinished {
            dataset_key: target.dataset_key.clone(),
            bytes: written,
        });
        Ok(written)
    }

    /// Download one dataset's archive into `dest_dir`
    ///
    /// Never fails: problems are logged and returned as the outcome. The
    /// politeness delay follows every dataset that reached the network.
    pub async fn download_dataset(
        &self,
        record: &DatasetRecord,
        dest_dir: &Path,
        reporter: &dyn ProgressReporter,
    ) -> DownloadOutcome {
        let Some(key) = record.key() else {
            warn!("skipping dataset because it has no key");
            return DownloadOutcome::Skipped {
                dataset_key: None,
                reason: SkipReason::MissingKey,
            };
        };
        if !is_safe_key(key) {
            warn!(dataset_key = key, "skipping dataset whose key is not a valid file name");
            return DownloadOutcome::Skipped {
                dataset_key: Some(key.to_string()),
                reason: SkipReason::InvalidKey,
            };
        }

        info!(dataset_key = key, title = %record.display_title(), "processing dataset");
        let outcome = self.fetch_archive(key, dest_dir, reporter).await;
        self.pause().await;
        outcome
    }

    async fn fetch_archive(
        &self,
        key: &str,
        dest_dir: &Path,
        reporter: &dyn ProgressReporter,
    ) -> DownloadOutcome {
        let target = match self.resolve_target(key, dest_dir).await {
            Ok(Some(target)) => target,
            Ok(None) => {
                info!(dataset_key = key, "no archive download link found, skipping");
                return DownloadOutcome::Skipped {
                    dataset_key: Some(key.to_string()),
                    reason: SkipReason::NoArchiveEndpoint,
                };
            }
            Err(e) if e.is_not_found() => {
                warn!(dataset_key = key, error = %e, "dataset details not found, skipping");
                return DownloadOutcome::Skipped {
                    dataset_key: Some(key.to_string()),
                    reason: SkipReason::DetailNotFound,
                };
            }
            Err(e) => return failed(key, e),
        };

        debug!(dataset_key = key, url = %target.url, "found archive link");
        match self.stream_to_file(&target, reporter).await {
            Ok(bytes) => {
                info!(dataset_key = key, bytes, "download complete");
                DownloadOutcome::Downloaded {
                    dataset_key: key.to_string(),
                    path: target.path,
                    bytes,
                }
            }
            Err(e) => failed(key, e),
        }
    }

    /// Download every record in order; one failure never stops the batch
    ///
    /// A key seen earlier in the same batch is skipped so that no two records
    /// write the same archive.
    pub async fn download_all(
        &self,
        records: &[DatasetRecord],
        dest_dir: &Path,
        reporter: &dyn ProgressReporter,
    ) -> BatchReport {
        let total = records.len();
        let mut seen: HashSet<String> = HashSet::new();
        let mut report = BatchReport::default();

        for (i, record) in records.iter().enumerate() {
            debug!(index = i + 1, total, "dataset {}/{}", i + 1, total);

            let outcome = match record.key() {
                Some(key) if !seen.insert(key.to_string()) => {
                    warn!(dataset_key = key, "duplicate dataset key in catalog, skipping");
                    DownloadOutcome::Skipped {
                        dataset_key: Some(key.to_string()),
                        reason: SkipReason::DuplicateKey,
                    }
                }
                _ => self.download_dataset(record, dest_dir, reporter).await,
            };
            report.outcomes.push(outcome);

            reporter.report(ProgressEvent::DatasetCompleted { index: i + 1, total });
        }

        info!(
            downloaded = report.downloaded(),
            skipped = report.skipped(),
            failed = report.failed(),
            bytes = report.total_bytes(),
            "download batch finished"
        );
        report
    }

    async fn pause(&self) {
        if !self.api.request_delay.is_zero() {
            tokio::time::sleep(self.api.request_delay).await;
        }
    }
}

async fn write_chunk(file: &mut tokio::fs::File, chunk: &[u8]) -> Result<u64> {
    file.write_all(chunk).await?;
    Ok(chunk.len() as u64)
}

fn report_chunk(
    reporter: &dyn ProgressReporter,
    target: &DownloadTarget,
    written: u64,
    total: Option<u64>,
) {
    reporter.report(ProgressEvent::ChunkWritten {
        dataset_key: target.dataset_key.clone(),
        written,
        total,
    });
}

fn failed(key: &str, e: Error) -> DownloadOutcome {
    warn!(dataset_key = key, category = %e.category(), error = %e, "failed to download dataset");
    DownloadOutcome::Failed {
        dataset_key: key.to_string(),
        error: e.to_string(),
        category: e.category(),
    }
}
