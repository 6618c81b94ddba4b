//! Download every Darwin Core Archive published by a GBIF organization.
//!
//! # Usage
//!
//! ```bash
//! # Prompt for the publisher and for the unzip step
//! gbif-dl
//!
//! # Fully non-interactive
//! gbif-dl --publisher b351a324-872b-47c5-a476-c08b28f73e73 --extract
//!
//! # Custom download directory and config file
//! gbif-dl --download-dir data --config gbif-dl.json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use gbif_dl::{
    Config, DownloadOutcome, ProgressEvent, ProgressReporter, RunOptions, Session, TerminalInput,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Bulk downloader for a GBIF publisher's datasets
#[derive(Parser)]
#[command(name = "gbif-dl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Publisher (organization) UUID; prompted for when omitted
    #[arg(short, long)]
    publisher: Option<String>,

    /// Directory receiving the archives
    #[arg(short, long)]
    download_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL of the GBIF API
    #[arg(long)]
    api_url: Option<Url>,

    /// Pause between requests, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Extract the archives after downloading without asking
    #[arg(long, conflicts_with = "no_extract")]
    extract: bool,

    /// Keep the archives as downloaded without asking
    #[arg(long)]
    no_extract: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Logs progress; chunk events are only logged every few megabytes
#[derive(Default)]
struct LogProgress {
    last_logged: AtomicU64,
}

const LOG_EVERY_BYTES: u64 = 8 * 1024 * 1024;

impl ProgressReporter for LogProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::DownloadStarted { dataset_key, total } => {
                self.last_logged.store(0, Ordering::Relaxed);
                debug!(dataset_key, ?total, "download started");
            }
            ProgressEvent::ChunkWritten {
                dataset_key,
                written,
                total,
            } => {
                let last = self.last_logged.load(Ordering::Relaxed);
                if written.saturating_sub(last) >= LOG_EVERY_BYTES {
                    self.last_logged.store(written, Ordering::Relaxed);
                    match total {
                        Some(total) if total > 0 => info!(
                            dataset_key,
                            "{:.1}% ({} / {} bytes)",
                            written as f64 * 100.0 / total as f64,
                            written,
                            total
                        ),
                        _ => info!(dataset_key, "{} bytes", written),
                    }
                }
            }
            ProgressEvent::DownloadFinished { dataset_key, bytes } => {
                debug!(dataset_key, bytes, "download finished");
            }
            ProgressEvent::DatasetCompleted { index, total } => {
                info!("overall progress: dataset {}/{}", index, total);
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if let Some(dir) = &cli.download_dir {
        config.download.download_dir = dir.clone();
    }
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    if let Some(delay) = cli.delay_ms {
        config.api.request_delay = Duration::from_millis(delay);
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    println!("--- GBIF Publisher Dataset Downloader ---");

    let config = load_config(&cli)?;
    let download_dir = config.download.download_dir.clone();
    let session = Session::with_http(config).context("failed to set up session")?;

    let options = RunOptions {
        publisher: cli.publisher.clone(),
        extract: match (cli.extract, cli.no_extract) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        },
    };

    let summary = session
        .run(&mut TerminalInput, options, &LogProgress::default())
        .await
        .with_context(|| "download session failed")?;

    if summary.datasets_found == 0 {
        println!("No datasets found to download.");
        return Ok(());
    }

    for outcome in &summary.downloads.outcomes {
        match outcome {
            DownloadOutcome::Skipped {
                dataset_key,
                reason,
            } => warn!(dataset_key = dataset_key.as_deref().unwrap_or("-"), %reason, "skipped"),
            DownloadOutcome::Failed {
                dataset_key,
                error,
                category,
            } => warn!(dataset_key, %category, error, "failed"),
            DownloadOutcome::Downloaded { .. } => {}
        }
    }

    println!(
        "Datasets: {} found, {} downloaded ({} bytes), {} skipped, {} failed",
        summary.datasets_found,
        summary.downloads.downloaded(),
        summary.downloads.total_bytes(),
        summary.downloads.skipped(),
        summary.downloads.failed()
    );
    if let Some(extraction) = &summary.extraction {
        println!(
            "Archives: {} extracted, {} failed, {} could not be removed",
            extraction.extracted.len(),
            extraction.failed.len(),
            extraction.cleanup_warnings.len()
        );
    }
    println!(
        "All tasks are complete. Files are saved in the '{}' directory.",
        download_dir.display()
    );

    Ok(())
}
