//! Publisher catalog paging
//!
//! Collects every dataset record a publisher owns by walking the search
//! endpoint page by page until the server signals the end or returns an
//! empty page.

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::http::Fetcher;
use crate::types::{CatalogPage, DatasetRecord};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Fetches the full dataset catalog of a publisher
pub struct CatalogFetcher {
    fetcher: Arc<dyn Fetcher>,
    config: ApiConfig,
}

impl CatalogFetcher {
    /// Create a catalog fetcher using the given network access and settings
    pub fn new(fetcher: Arc<dyn Fetcher>, config: ApiConfig) -> Self {
        Self { fetcher, config }
    }

    /// Request one page of the publisher's datasets starting at `offset`
    ///
    /// A 404 is reported as [`Error::PublisherNotFound`]; any other non-2xx
    /// status as [`Error::HttpStatus`].
    pub async fn fetch_page(&self, publisher: &str, offset: u64) -> Result<CatalogPage> {
        let mut url = self.config.search_url()?;
        url.query_pairs_mut()
            .append_pair("publishingOrg", publisher)
            .append_pair("offset", &offset.to_string())
            .append_pair("limit", &self.config.page_size.to_string());

        debug!(
            publisher,
            offset,
            limit = self.config.page_size,
            "requesting page of datasets"
        );

        let response = self.fetcher.get(&url).await?;
        if response.status == 404 {
            return Err(Error::PublisherNotFound(publisher.to_string()));
        }
        response.error_for_status()?.json().await
    }

    /// Collect every dataset record of `publisher`, in catalog order
    ///
    /// Fails fast on an empty identifier. Any failure aborts the whole walk and
    /// the records gathered so far are discarded, so a returned list is always
    /// the complete catalog.
    pub async fn fetch_all(&self, publisher: &str) -> Result<Vec<DatasetRecord>> {
        let publisher = publisher.trim();
        if publisher.is_empty() {
            return Err(Error::InvalidInput(
                "publisher identifier cannot be empty".to_string(),
            ));
        }

        info!(publisher, "fetching datasets for publisher");

        let mut datasets = Vec::new();
        let mut offset: u64 = 0;

        loop {
            if offset > 0 && !self.config.request_delay.is_zero() {
                tokio::time::sleep(self.config.request_delay).await;
            }

            let page = self.fetch_page(publisher, offset).await?;

            if page.results.is_empty() {
                debug!(offset, "empty page, no more datasets for this publisher");
                break;
            }

            datasets.extend(page.results);
            info!(found = datasets.len(), "found {} datasets so far", datasets.len());

            if page.end_of_records {
                break;
            }
            offset += u64::from(self.config.page_size);
        }

        Ok(datasets)
    }

    /// Like [`fetch_all`](Self::fetch_all), but reports the failure and returns
    /// an empty list instead of an error
    pub async fn fetch_all_or_empty(&self, publisher: &str) -> Vec<DatasetRecord> {
        match self.fetch_all(publisher).await {
            Ok(datasets) => datasets,
            Err(Error::PublisherNotFound(id)) => {
                warn!(publisher = %id, "organization not found");
                Vec::new()
            }
            Err(e) => {
                error!(publisher, category = %e.category(), error = %e, "catalog fetch failed");
                Vec::new()
            }
        }
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{CannedFetcher, search_page_url, test_api_config};
    use serde_json::{Value, json};

    const PUBLISHER: &str = "b351a324-872b-47c5-a476-c08b28f73e73";

    fn records(range: std::ops::Range<usize>) -> Vec<Value> {
        range
            .map(|i| json!({"key": format!("ds-{i}"), "title": format!("Dataset {i}")}))
            .collect()
    }

    fn page(offset: u64, limit: u32, end: bool, results: Vec<Value>) -> Value {
        json!({"offset": offset, "limit": limit, "endOfRecords": end, "count": 0, "results": results})
    }

    fn catalog_with(fetcher: CannedFetcher, page_size: u32) -> (CatalogFetcher, Arc<CannedFetcher>) {
        let fetcher = Arc::new(fetcher);
        (
            CatalogFetcher::new(fetcher.clone(), test_api_config(page_size)),
            fetcher,
        )
    }

    #[tokio::test]
    async fn collects_all_pages_in_order() {
        let api = test_api_config(3);
        let fetcher = CannedFetcher::new()
            .json(&search_page_url(&api, PUBLISHER, 0), 200, page(0, 3, false, records(0..3)))
            .json(&search_page_url(&api, PUBLISHER, 3), 200, page(3, 3, false, records(3..6)))
            .json(&search_page_url(&api, PUBLISHER, 6), 200, page(6, 3, true, records(6..7)));
        let (catalog, fetcher) = catalog_with(fetcher, 3);

        let datasets = catalog.fetch_all(PUBLISHER).await.unwrap();

        let keys: Vec<&str> = datasets.iter().filter_map(|d| d.key()).collect();
        assert_eq!(keys, vec!["ds-0", "ds-1", "ds-2", "ds-3", "ds-4", "ds-5", "ds-6"]);
        // ceil(7 / 3) page requests
        assert_eq!(fetcher.requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_falls_between_pages_only() {
        let api = ApiConfig {
            request_delay: std::time::Duration::from_secs(1),
            ..test_api_config(3)
        };
        let fetcher = CannedFetcher::new()
            .json(&search_page_url(&api, PUBLISHER, 0), 200, page(0, 3, false, records(0..3)))
            .json(&search_page_url(&api, PUBLISHER, 3), 200, page(3, 3, false, records(3..6)))
            .json(&search_page_url(&api, PUBLISHER, 6), 200, page(6, 3, true, records(6..7)));
        let catalog = CatalogFetcher::new(Arc::new(fetcher), api);

        let start = tokio::time::Instant::now();
        let datasets = catalog.fetch_all(PUBLISHER).await.unwrap();

        assert_eq!(datasets.len(), 7);
        // Three pages, two pauses
        assert_eq!(start.elapsed(), std::time::Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn single_page_is_not_delayed() {
        let api = ApiConfig {
            request_delay: std::time::Duration::from_secs(1),
            ..test_api_config(3)
        };
        let fetcher = CannedFetcher::new().json(
            &search_page_url(&api, PUBLISHER, 0),
            200,
            page(0, 3, true, records(0..1)),
        );
        let catalog = CatalogFetcher::new(Arc::new(fetcher), api);

        let start = tokio::time::Instant::now();
        catalog.fetch_all(PUBLISHER).await.unwrap();

        assert_eq!(start.elapsed(), std::time::Duration::ZERO);
    }

    #[tokio::test]
    async fn exact_multiple_of_page_size() {
        let api = test_api_config(2);
        let fetcher = CannedFetcher::new()
            .json(&search_page_url(&api, PUBLISHER, 0), 200, page(0, 2, false, records(0..2)))
            .json(&search_page_url(&api, PUBLISHER, 2), 200, page(2, 2, true, records(2..4)));
        let (catalog, fetcher) = catalog_with(fetcher, 2);

        let datasets = catalog.fetch_all(PUBLISHER).await.unwrap();
        assert_eq!(datasets.len(), 4);
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[tokio::test]
    async fn stops_on_empty_page_even_without_end_flag() {
        let api = test_api_config(2);
        let fetcher = CannedFetcher::new()
            .json(&search_page_url(&api, PUBLISHER, 0), 200, page(0, 2, false, records(0..2)))
            .json(&search_page_url(&api, PUBLISHER, 2), 200, page(2, 2, false, vec![]));
        let (catalog, fetcher) = catalog_with(fetcher, 2);

        let datasets = catalog.fetch_all(PUBLISHER).await.unwrap();
        assert_eq!(datasets.len(), 2);
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[tokio::test]
    async fn missing_end_flag_means_last_page() {
        let api = test_api_config(2);
        let fetcher = CannedFetcher::new().json(
            &search_page_url(&api, PUBLISHER, 0),
            200,
            json!({"offset": 0, "limit": 2, "results": records(0..2)}),
        );
        let (catalog, fetcher) = catalog_with(fetcher, 2);

        assert_eq!(catalog.fetch_all(PUBLISHER).await.unwrap().len(), 2);
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn not_found_stops_immediately() {
        // Nothing registered: every URL answers 404
        let (catalog, fetcher) = catalog_with(CannedFetcher::new(), 2);

        let err = catalog.fetch_all(PUBLISHER).await.unwrap_err();
        assert!(matches!(err, Error::PublisherNotFound(ref id) if id == PUBLISHER));
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn not_found_or_empty_returns_empty() {
        let (catalog, fetcher) = catalog_with(CannedFetcher::new(), 2);

        assert!(catalog.fetch_all_or_empty(PUBLISHER).await.is_empty());
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn server_error_discards_partial_results() {
        let api = test_api_config(2);
        let fetcher = CannedFetcher::new()
            .json(&search_page_url(&api, PUBLISHER, 0), 200, page(0, 2, false, records(0..2)))
            .json(&search_page_url(&api, PUBLISHER, 2), 503, json!({"error": "unavailable"}));
        let (catalog, fetcher) = catalog_with(fetcher, 2);

        let err = catalog.fetch_all(PUBLISHER).await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert!(catalog.fetch_all_or_empty(PUBLISHER).await.is_empty());
        assert_eq!(fetcher.requests().len(), 4);
    }

    #[tokio::test]
    async fn network_failure_aborts_fetch() {
        let api = test_api_config(2);
        let fetcher = CannedFetcher::new().reset(&search_page_url(&api, PUBLISHER, 0));
        let (catalog, _fetcher) = catalog_with(fetcher, 2);

        let err = catalog.fetch_all(PUBLISHER).await.unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::Transient);
    }

    #[tokio::test]
    async fn malformed_json_is_serialization_error() {
        let api = test_api_config(2);
        let fetcher = CannedFetcher::new().bytes(
            &search_page_url(&api, PUBLISHER, 0),
            200,
            b"<html>not json</html>".to_vec(),
            usize::MAX,
        );
        let (catalog, _fetcher) = catalog_with(fetcher, 2);

        let err = catalog.fetch_all(PUBLISHER).await.unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[tokio::test]
    async fn empty_publisher_issues_no_request() {
        let (catalog, fetcher) = catalog_with(CannedFetcher::new(), 2);

        let err = catalog.fetch_all("   ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn publisher_identifier_is_trimmed() {
        let api = test_api_config(5);
        let fetcher = CannedFetcher::new().json(
            &search_page_url(&api, PUBLISHER, 0),
            200,
            page(0, 5, true, records(0..1)),
        );
        let (catalog, fetcher) = catalog_with(fetcher, 5);

        let datasets = catalog.fetch_all(&format!("  {PUBLISHER}\n")).await.unwrap();
        assert_eq!(datasets.len(), 1);
        let query: Vec<(String, String)> = fetcher.requests()[0]
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            query,
            vec![
                ("publishingOrg".to_string(), PUBLISHER.to_string()),
                ("offset".to_string(), "0".to_string()),
                ("limit".to_string(), "5".to_string()),
            ]
        );
    }
}
