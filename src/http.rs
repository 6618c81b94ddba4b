//! HTTP fetch interface
//!
//! Catalog paging and archive streaming only see the [`Fetcher`] trait, so they
//! can be driven by canned responses in tests. [`HttpFetcher`] is the reqwest
//! implementation used by the binaries.

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Response body as a stream of byte chunks
pub type ByteStream = BoxStream<'static, Result<Vec<u8>>>;

/// A response whose body has not been read yet
pub struct FetchResponse {
    /// The URL that was requested
    pub url: Url,
    /// HTTP status code
    pub status: u16,
    /// Declared body size (Content-Length), if any
    pub content_length: Option<u64>,
    /// Body chunks as they arrive
    pub body: ByteStream,
}

impl std::fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchResponse")
            .field("url", &self.url.as_str())
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

impl FetchResponse {
    /// Build a response from an in-memory body split into `chunk_size` pieces
    pub fn from_bytes(url: Url, status: u16, body: Vec<u8>, chunk_size: usize) -> Self {
        let content_length = Some(body.len() as u64);
        let chunks: Vec<Result<Vec<u8>>> = body
            .chunks(chunk_size.max(1))
            .map(|c| Ok(c.to_vec()))
            .collect();
        Self {
            url,
            status,
            content_length,
            body: stream::iter(chunks).boxed(),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into [`Error::HttpStatus`]
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::HttpStatus {
                status: self.status,
                url: self.url.to_string(),
            })
        }
    }

    /// Collect the whole body
    pub async fn bytes(self) -> Result<Vec<u8>> {
        self.body
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
    }

    /// Collect and deserialize a JSON body
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Request-in, response-out network access
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue a GET request. Non-2xx statuses are returned, not raised.
    async fn get(&self, url: &Url) -> Result<FetchResponse>;
}

#[async_trait]
impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    async fn get(&self, url: &Url) -> Result<FetchResponse> {
        (**self).get(url).await
    }
}

/// [`Fetcher`] backed by a reqwest client
///
/// The configured timeout bounds connecting, waiting for the response head,
/// and each gap between body chunks. It never bounds a whole body, so a large
/// archive that keeps arriving is never cut off.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a client from the API configuration
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| Error::Other(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }
}

fn timed_out(url: &Url, what: &str, timeout: Duration) -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::TimedOut,
        format!("{} from {} timed out after {:?}", what, url, timeout),
    ))
}

/// Fail the stream when no chunk arrives within `idle`, then end it
fn with_idle_timeout(
    inner: BoxStream<'static, Result<Vec<u8>>>,
    idle: Duration,
    url: Url,
) -> ByteStream {
    stream::unfold(Some(inner), move |state| {
        let url = url.clone();
        async move {
            let mut inner = state?;
            match tokio::time::timeout(idle, inner.next()).await {
                Ok(Some(chunk)) => Some((chunk, Some(inner))),
                Ok(None) => None,
                Err(_) => Some((Err(timed_out(&url, "body chunk", idle)), None)),
            }
        }
    })
    .boxed()
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &Url) -> Result<FetchResponse> {
        debug!(url = %url, "GET");
        let response = tokio::time::timeout(self.timeout, self.client.get(url.clone()).send())
            .await
            .map_err(|_| timed_out(url, "response", self.timeout))??;
        let status = response.status().as_u16();
        let content_length = response.content_length();
        debug!(url = %url, status, ?content_length, "response received");

        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(Error::from))
            .boxed();

        Ok(FetchResponse {
            url: url.clone(),
            status,
            content_length,
            body: with_idle_timeout(chunks, self.timeout, url.clone()),
        })
    }
}
