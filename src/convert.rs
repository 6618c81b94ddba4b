//! Delimited text conversion
//!
//! Rewrites the tab-separated data files of every extracted dataset directory
//! as comma-separated files next to the originals. Rows and fields are copied
//! as-is: no header handling, no type inference.
//!
//! Failures are per file: a file that cannot be converted is logged and
//! recorded in the [`ConversionReport`], and the remaining files are still
//! processed.

use crate::config::ConvertConfig;
use crate::error::{Error, Result};
use crate::types::{ConversionReport, ItemFailure};
use csv::{ByteRecord, ReaderBuilder, Terminator, WriterBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Converts delimited text files from one delimiter to another
#[derive(Clone, Debug)]
pub struct FormatConverter {
    config: ConvertConfig,
}

impl FormatConverter {
    /// Create a converter with the given extensions and delimiters
    pub fn new(config: ConvertConfig) -> Self {
        Self { config }
    }

    /// Immediate subdirectories of `root`, sorted
    pub fn find_subdirectories(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let path = entry?.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    /// Files directly inside `dir` carrying the source extension, sorted
    pub fn find_source_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && has_extension(&path, &self.config.source_extension) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Path of the converted sibling of `source`
    pub fn target_path(&self, source: &Path) -> PathBuf {
        source.with_extension(&self.config.target_extension)
    }

    /// Convert one file, returning the written path and its row count
    ///
    /// Output goes to a `.part` file that replaces the target only once every
    /// row has been written.
    pub fn convert_file(&self, source: &Path) -> Result<(PathBuf, u64)> {
        let target = self.target_path(source);
        let mut partial = target.as_os_str().to_os_string();
        partial.push(".part");
        let partial = PathBuf::from(partial);

        match self.write_converted(source, &partial) {
            Ok(rows) => {
                std::fs::rename(&partial, &target)?;
                debug!(?source, ?target, rows, "converted file");
                Ok((target, rows))
            }
            Err(e) => {
                if let Err(remove_err) = std::fs::remove_file(&partial)
                    && remove_err.kind() != std::io::ErrorKind::NotFound
                {
                    warn!(path = ?partial, error = %remove_err, "could not remove partial output");
                }
                Err(e)
            }
        }
    }

    fn write_converted(&self, source: &Path, partial: &Path) -> Result<u64> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.config.source_delimiter as u8)
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_path(source)?;
        let mut writer = WriterBuilder::new()
            .delimiter(self.config.target_delimiter as u8)
            .terminator(Terminator::CRLF)
            .flexible(true)
            .from_path(partial)?;

        let mut record = ByteRecord::new();
        let mut rows: u64 = 0;
        while reader.read_byte_record(&mut record)? {
            writer.write_byte_record(&record)?;
            rows += 1;
        }
        writer.flush()?;
        Ok(rows)
    }

    /// Convert every source file in every subdirectory of `root`
    ///
    /// Only an unreadable `root` is an error.
    pub fn convert_tree(&self, root: &Path) -> Result<ConversionReport> {
        if !root.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("directory not found: {}", root.display()),
            )));
        }

        let subdirs = self.find_subdirectories(root)?;
        let num_dirs = subdirs.len();
        let mut report = ConversionReport::default();

        for (dir_idx, subdir) in subdirs.iter().enumerate() {
            let files = match self.find_source_files(subdir) {
                Ok(files) => files,
                Err(e) => {
                    warn!(dir = ?subdir, error = %e, "could not list directory, skipping");
                    report.failed.push(ItemFailure {
                        path: subdir.clone(),
                        error: e.to_string(),
                        category: e.category(),
                    });
                    continue;
                }
            };
            info!(
                dir = ?subdir,
                files = files.len(),
                "directory {}/{}",
                dir_idx + 1,
                num_dirs
            );

            for file in files {
                match self.convert_file(&file) {
                    Ok(converted) => report.converted.push(converted),
                    Err(e) => {
                        warn!(file = ?file, category = %e.category(), error = %e, "conversion failed");
                        report.failed.push(ItemFailure {
                            path: file,
                            error: e.to_string(),
                            category: e.category(),
                        });
                    }
                }
            }
        }

        info!(
            converted = report.converted.len(),
            failed = report.failed.len(),
            rows = report.total_rows(),
            "conversion complete"
        );
        Ok(report)
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension.trim_start_matches('.')))
        .unwrap_or(false)
}
