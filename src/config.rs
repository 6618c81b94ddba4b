//! Configuration types for gbif-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Catalog API settings (endpoint, paging, politeness delay, timeouts)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the API; search and detail paths are resolved against it
    /// (default: "https://api.gbif.org/v1/")
    #[serde(default = "default_base_url")]
    pub base_url: Url,

    /// Number of records requested per catalog page (default: 100)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Fixed pause between consecutive requests, in milliseconds (default: 1000)
    #[serde(default = "default_request_delay", with = "duration_millis_serde")]
    #[serde(rename = "request_delay_ms")]
    pub request_delay: Duration,

    /// Limit in seconds for connecting, for the response head and for each
    /// gap between body chunks (default: 60)
    #[serde(default = "default_timeout", with = "duration_serde")]
    #[serde(rename = "timeout_secs")]
    pub timeout: Duration,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            request_delay: default_request_delay(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl ApiConfig {
    /// URL of the paginated dataset search endpoint
    pub fn search_url(&self) -> Result<Url> {
        self.endpoint_url(&["dataset", "search"])
    }

    /// URL of the detail endpoint for one dataset
    pub fn dataset_url(&self, key: &str) -> Result<Url> {
        self.endpoint_url(&["dataset", key])
    }

    /// Append `segments` to the base path, with or without its trailing slash
    fn endpoint_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::config("api.base_url", "base URL cannot have path segments"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Archive download settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory receiving one archive per dataset (default: "gbif_downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Endpoint type tag identifying the archive to fetch (default: "DWC_ARCHIVE")
    #[serde(default = "default_archive_endpoint_type")]
    pub archive_endpoint_type: String,

    /// Extension given to downloaded archives, without the dot (default: "zip")
    #[serde(default = "default_archive_extension")]
    pub archive_extension: String,

    /// Size of each write to disk while streaming, in bytes (default: 1024)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            archive_endpoint_type: default_archive_endpoint_type(),
            archive_extension: default_archive_extension(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// Delimiter conversion settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Root whose subdirectories are scanned (default: "gbif_downloads")
    #[serde(default = "default_download_dir")]
    pub root_dir: PathBuf,

    /// Extension of the files to convert (default: "txt")
    #[serde(default = "default_source_extension")]
    pub source_extension: String,

    /// Extension of the files written (default: "csv")
    #[serde(default = "default_target_extension")]
    pub target_extension: String,

    /// Field delimiter of the input files (default: tab)
    #[serde(default = "default_source_delimiter")]
    pub source_delimiter: char,

    /// Field delimiter of the output files (default: comma)
    #[serde(default = "default_target_delimiter")]
    pub target_delimiter: char,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            root_dir: default_download_dir(),
            source_extension: default_source_extension(),
            target_extension: default_target_extension(),
            source_delimiter: default_source_delimiter(),
            target_delimiter: default_target_delimiter(),
        }
    }
}

/// Main configuration
///
/// Every setting has a default, so an empty JSON object is a valid config file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Catalog API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Archive download settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Delimiter conversion settings
    #[serde(default)]
    pub convert: ConvertConfig,
}

impl Config {
    /// Load configuration from a JSON file; absent fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read config file '{}': {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&content).map_err(|e| Error::Config {
            message: format!("failed to parse config file '{}': {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the components cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.api.page_size == 0 {
            return Err(Error::config("api.page_size", "must be greater than zero"));
        }
        if self.api.base_url.cannot_be_a_base() {
            return Err(Error::config("api.base_url", "must be an absolute http(s) URL"));
        }
        if self.download.chunk_size == 0 {
            return Err(Error::config("download.chunk_size", "must be greater than zero"));
        }
        if self.download.archive_extension.trim().is_empty() {
            return Err(Error::config("download.archive_extension", "must not be empty"));
        }
        if self.download.archive_endpoint_type.trim().is_empty() {
            return Err(Error::config(
                "download.archive_endpoint_type",
                "must not be empty",
            ));
        }
        if self.convert.source_extension.trim().is_empty()
            || self.convert.target_extension.trim().is_empty()
        {
            return Err(Error::config("convert", "extensions must not be empty"));
        }
        if self
            .convert
            .source_extension
            .eq_ignore_ascii_case(&self.convert.target_extension)
        {
            return Err(Error::config(
                "convert.target_extension",
                "must differ from the source extension",
            ));
        }
        for (key, delimiter) in [
            ("convert.source_delimiter", self.convert.source_delimiter),
            ("convert.target_delimiter", self.convert.target_delimiter),
        ] {
            if !delimiter.is_ascii() {
                return Err(Error::config(key, "must be a single ASCII character"));
            }
        }
        Ok(())
    }
}

// The literal is a valid absolute URL
#[allow(clippy::expect_used)]
fn default_base_url() -> Url {
    Url::parse("https://api.gbif.org/v1/").expect("default base URL is valid")
}

fn default_page_size() -> u32 {
    100
}

fn default_request_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_user_agent() -> String {
    format!("gbif-dl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("gbif_downloads")
}

fn default_archive_endpoint_type() -> String {
    "DWC_ARCHIVE".to_string()
}

fn default_archive_extension() -> String {
    "zip".to_string()
}

fn default_chunk_size() -> usize {
    1024
}

fn default_source_extension() -> String {
    "txt".to_string()
}

fn default_target_extension() -> String {
    "csv".to_string()
}

fn default_source_delimiter() -> char {
    '\t'
}

fn default_target_delimiter() -> char {
    ','
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
