//! Archive extraction
//!
//! Every archive directly inside a directory is unpacked into a sibling
//! directory named after the archive's stem, and the archive is deleted once
//! its contents are on disk. Archives that cannot be read stay where they are.

use crate::error::{ArchiveError, Error, Result};
use crate::types::{ExtractionReport, ItemFailure};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extracts zip archives found in a directory
#[derive(Clone, Debug)]
pub struct ArchiveExtractor {
    extension: String,
}

impl Default for ArchiveExtractor {
    fn default() -> Self {
        Self::new("zip")
    }
}

impl ArchiveExtractor {
    /// Create an extractor for files ending in `.{extension}` (case-insensitive)
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into().trim_start_matches('.').to_lowercase(),
        }
    }

    /// List the archives directly inside `dir`, sorted by file name
    pub fn detect_archives(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        debug!(?dir, "detecting archives");

        let mut archives = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(ext) = path.extension()
                && ext.to_string_lossy().to_lowercase() == self.extension
            {
                archives.push(path);
            }
        }
        archives.sort();

        debug!("found {} archive(s)", archives.len());
        Ok(archives)
    }

    /// Directory an archive is extracted into: its path without the extension
    pub fn output_dir(archive_path: &Path) -> PathBuf {
        archive_path.with_extension("")
    }

    /// Extract one archive into [`output_dir`](Self::output_dir)
    ///
    /// The archive is opened before the directory is created, so an unreadable
    /// archive leaves nothing behind. Returns the extracted file paths.
    pub fn extract_archive(&self, archive_path: &Path) -> Result<Vec<PathBuf>> {
        let file = File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| ArchiveError::Corrupt {
            archive: archive_path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let dest_path = Self::output_dir(archive_path);
        std::fs::create_dir_all(&dest_path)?;
        debug!(?archive_path, ?dest_path, entries = archive.len(), "extracting archive");

        let mut extracted_files = Vec::new();
        for i in 0..archive.len() {
            let entry = archive.by_index(i).map_err(|e| ArchiveError::ExtractionFailed {
                archive: archive_path.to_path_buf(),
                reason: format!("failed to read entry {}: {}", i, e),
            })?;
            if let Some(path) = extract_entry(entry, &dest_path, archive_path)? {
                extracted_files.push(path);
            }
        }

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "extraction successful"
        );
        Ok(extracted_files)
    }

    /// Extract every archive in `dir` and delete each one that extracted cleanly
    ///
    /// Only an unreadable `dir` is an error; per-archive failures are collected
    /// in the report and the batch carries on.
    pub fn extract_all(&self, dir: &Path) -> Result<ExtractionReport> {
        if !dir.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("download directory not found: {}", dir.display()),
            )));
        }

        let archives = self.detect_archives(dir)?;
        let mut report = ExtractionReport::default();
        if archives.is_empty() {
            info!(?dir, "no archives found to extract");
            return Ok(report);
        }

        info!(?dir, count = archives.len(), "extracting {} archives", archives.len());

        for archive_path in archives {
            match self.extract_archive(&archive_path) {
                Ok(_) => {
                    report.extracted.push(Self::output_dir(&archive_path));
                    if let Err(e) = std::fs::remove_file(&archive_path) {
                        warn!(?archive_path, error = %e, "could not remove archive after extraction");
                        report.cleanup_warnings.push(ItemFailure {
                            path: archive_path,
                            error: e.to_string(),
                            category: crate::error::ErrorCategory::Filesystem,
                        });
                    }
                }
                Err(e) => {
                    warn!(?archive_path, category = %e.category(), error = %e, "failed to extract archive, skipping");
                    report.failed.push(ItemFailure {
                        path: archive_path,
                        error: e.to_string(),
                        category: e.category(),
                    });
                }
            }
        }

        info!(
            extracted = report.extracted.len(),
            failed = report.failed.len(),
            "extraction and cleanup complete"
        );
        Ok(report)
    }
}

/// Write one archive entry below `dest_path`, creating directories as needed
fn extract_entry(
    mut entry: zip::read::ZipFile,
    dest_path: &Path,
    archive_path: &Path,
) -> Result<Option<PathBuf>> {
    let file_path = match entry.enclosed_name() {
        Some(path) => dest_path.join(path),
        None => {
            warn!(?archive_path, name = entry.name(), "skipping entry with unsafe path");
            return Ok(None);
        }
    };

    if entry.is_dir() {
        std::fs::create_dir_all(&file_path)?;
        return Ok(None);
    }

    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut outfile = File::create(&file_path)?;
    std::io::copy(&mut entry, &mut outfile).map_err(|e| ArchiveError::ExtractionFailed {
        archive: archive_path.to_path_buf(),
        reason: format!("failed to extract {}: {}", file_path.display(), e),
    })?;

    Ok(Some(file_path))
}
