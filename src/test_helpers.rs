//! Shared test helpers: a [`Fetcher`] answering from canned responses.

use crate::config::{ApiConfig, Config};
use crate::error::{Error, Result};
use crate::http::{FetchResponse, Fetcher};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

#[derive(Clone)]
enum Canned {
    Body {
        status: u16,
        body: Vec<u8>,
        chunk_size: usize,
        declared_length: Option<u64>,
    },
    ConnectionReset,
}

/// Fetcher that serves responses registered per URL and records every request.
/// Unregistered URLs answer 404.
#[derive(Default)]
pub(crate) struct CannedFetcher {
    responses: Mutex<HashMap<String, Canned>>,
    requests: Mutex<Vec<Url>>,
}

impl CannedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn json(self, url: &Url, status: u16, value: serde_json::Value) -> Self {
        self.bytes(url, status, value.to_string().into_bytes(), usize::MAX)
    }

    pub(crate) fn bytes(self, url: &Url, status: u16, body: Vec<u8>, chunk_size: usize) -> Self {
        self.responses.lock().unwrap().insert(
            url.to_string(),
            Canned::Body {
                status,
                declared_length: Some(body.len() as u64),
                body,
                chunk_size,
            },
        );
        self
    }

    /// Serve `body` while announcing `declared_length` as its Content-Length
    pub(crate) fn declared(self, url: &Url, body: Vec<u8>, declared_length: u64) -> Self {
        self.responses.lock().unwrap().insert(
            url.to_string(),
            Canned::Body {
                status: 200,
                body,
                chunk_size: 64,
                declared_length: Some(declared_length),
            },
        );
        self
    }

    pub(crate) fn reset(self, url: &Url) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Canned::ConnectionReset);
        self
    }

    pub(crate) fn requests(&self) -> Vec<Url> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for CannedFetcher {
    async fn get(&self, url: &Url) -> Result<FetchResponse> {
        self.requests.lock().unwrap().push(url.clone());
        let canned = self.responses.lock().unwrap().get(url.as_str()).cloned();
        match canned {
            Some(Canned::Body {
                status,
                body,
                chunk_size,
                declared_length,
            }) => {
                let mut response = FetchResponse::from_bytes(url.clone(), status, body, chunk_size);
                response.content_length = declared_length;
                Ok(response)
            }
            Some(Canned::ConnectionReset) => Err(Error::Io(std::io::Error::from(
                std::io::ErrorKind::ConnectionReset,
            ))),
            None => Ok(FetchResponse::from_bytes(url.clone(), 404, Vec::new(), 1)),
        }
    }
}

/// API settings pointing at a fake host, with no politeness delay
pub(crate) fn test_api_config(page_size: u32) -> ApiConfig {
    ApiConfig {
        base_url: Url::parse("https://api.test/v1/").unwrap(),
        page_size,
        request_delay: Duration::ZERO,
        ..Default::default()
    }
}

/// Full configuration rooted in `dir`, with no politeness delay
pub(crate) fn test_config(dir: &Path, page_size: u32) -> Config {
    let mut config = Config {
        api: test_api_config(page_size),
        ..Default::default()
    };
    config.download.download_dir = dir.join("gbif_downloads");
    config.convert.root_dir = dir.join("gbif_downloads");
    config
}

/// Search URL for one page, built the way the catalog fetcher builds it
pub(crate) fn search_page_url(api: &ApiConfig, publisher: &str, offset: u64) -> Url {
    let mut url = api.search_url().unwrap();
    url.query_pairs_mut()
        .append_pair("publishingOrg", publisher)
        .append_pair("offset", &offset.to_string())
        .append_pair("limit", &api.page_size.to_string());
    url
}

/// Build a zip archive holding the given files
pub(crate) fn create_zip_archive(archive_path: &Path, files: &[(&str, &[u8])]) {
    let file = std::fs::File::create(archive_path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        std::io::Write::write_all(&mut writer, content).unwrap();
    }
    writer.finish().unwrap();
}

/// Zip archive bytes holding the given files
pub(crate) fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("archive.zip");
    create_zip_archive(&path, files);
    std::fs::read(path).unwrap()
}
