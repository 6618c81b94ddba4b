//! Convert the tab-separated data files of extracted datasets to CSV.
//!
//! Every `.txt` file in each immediate subdirectory of ROOT gets a `.csv`
//! sibling with the same rows. Files that fail are reported and the exit
//! status is non-zero, but the other files are still converted.
//!
//! # Usage
//!
//! ```bash
//! tsv2csv                 # converts under ./gbif_downloads
//! tsv2csv data --verbose
//! ```

use anyhow::{Result, bail};
use clap::Parser;
use gbif_dl::{Config, FormatConverter};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Tab to comma converter for extracted Darwin Core Archives
#[derive(Parser)]
#[command(name = "tsv2csv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory whose subdirectories hold the extracted archives
    root: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if let Some(root) = cli.root {
        config.convert.root_dir = root;
    }
    config.validate()?;

    let root = config.convert.root_dir.clone();
    let converter = FormatConverter::new(config.convert);
    let report = tokio::task::spawn_blocking(move || converter.convert_tree(&root)).await??;

    println!(
        "Converted {} files ({} rows), {} failed",
        report.converted.len(),
        report.total_rows(),
        report.failed.len()
    );
    for failure in &report.failed {
        error!(path = ?failure.path, category = %failure.category, error = %failure.error, "not converted");
    }
    if !report.failed.is_empty() {
        bail!("{} file(s) could not be converted", report.failed.len());
    }
    Ok(())
}
