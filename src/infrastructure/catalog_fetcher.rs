//! Drives one store's catalog retrieval to completion
//!
//! Pages are requested forward-only starting at 0 and accumulated fully
//! in memory; the commit phase never overlaps the network phase. A failed
//! page aborts the run and reports how many full batches landed before
//! it. There is no mid-flight resume: a retry starts over at page 0,
//! which is fine because every store run is atomic-or-retried.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::constants::api::MAX_PAGES_PER_STORE;
use crate::domain::error::SearchError;
use crate::domain::events::{ProgressReporter, RefreshPhase, RefreshProgress};
use crate::domain::record::CatalogRecord;
use crate::domain::services::{Credential, SearchPageClient};

/// Complete fetch result for one store
#[derive(Debug, Clone)]
pub struct FetchedCatalog {
    pub store_number: String,
    pub records: Vec<CatalogRecord>,
    /// Non-empty pages consumed
    pub batches: u32,
    /// Total hit count as reported by the upstream
    pub total_hits: u32,
}

/// A fetch that aborted partway through its page sequence
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub error: SearchError,
    /// Full batches that succeeded before the failing page
    pub batches_completed: u32,
    pub records_fetched: u32,
}

pub struct PaginatedFetcher {
    client: Arc<dyn SearchPageClient>,
    max_pages: u32,
}

impl PaginatedFetcher {
    pub fn new(client: Arc<dyn SearchPageClient>) -> Self {
        Self {
            client,
            max_pages: MAX_PAGES_PER_STORE,
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Fetch every page for the store, reporting progress per batch.
    pub async fn fetch_store(
        &self,
        credential: &Credential,
        store_number: &str,
        reporter: &ProgressReporter,
    ) -> Result<FetchedCatalog, FetchFailure> {
        let mut records: Vec<CatalogRecord> = Vec::new();
        let mut batches = 0u32;
        let mut total_hits = 0u32;
        let mut page = 0u32;

        loop {
            if page >= self.max_pages {
                warn!(
                    "⚠️ Store {} hit the {} page cap, treating catalog as complete",
                    store_number, self.max_pages
                );
                break;
            }

            let page_data = match self.client.fetch_page(credential, store_number, page).await {
                Ok(page_data) => page_data,
                Err(error) => {
                    return Err(FetchFailure {
                        error,
                        batches_completed: batches,
                        records_fetched: records.len() as u32,
                    });
                }
            };

            total_hits = page_data.total_hits;
            let last = page_data.is_last();
            if page_data.hits.is_empty() {
                break;
            }

            batches += 1;
            records.extend(page_data.hits);
            debug!(
                "Store {}: batch {} complete, {} of {} records",
                store_number,
                batches,
                records.len(),
                total_hits
            );
            reporter.report(RefreshProgress::new(
                RefreshPhase::Fetching,
                Some(store_number.to_string()),
                records.len() as u32,
                total_hits,
                format!(
                    "Store {}: fetched {} of {} records",
                    store_number,
                    records.len(),
                    total_hits
                ),
            ));

            if last {
                break;
            }
            page += 1;
        }

        Ok(FetchedCatalog {
            store_number: store_number.to_string(),
            records,
            batches,
            total_hits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::SearchPage;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    fn record(id: &str) -> CatalogRecord {
        CatalogRecord {
            object_id: format!("obj-{id}"),
            product_id: Some(id.to_string()),
            ..CatalogRecord::default()
        }
    }

    fn page(ids: &[&str], page: u32, total_pages: u32, total_hits: u32) -> SearchPage {
        SearchPage {
            hits: ids.iter().map(|id| record(id)).collect(),
            total_hits,
            page,
            total_pages,
        }
    }

    fn credential() -> Credential {
        Credential {
            api_key: "key".to_string(),
            app_id: "app".to_string(),
            extracted_at: Utc::now(),
            expires_at: None,
        }
    }

    struct ScriptedClient {
        pages: Vec<SearchPage>,
        fail_on: Option<(u32, SearchError)>,
        requests: Mutex<Vec<u32>>,
    }

    impl ScriptedClient {
        fn new(pages: Vec<SearchPage>) -> Self {
            Self {
                pages,
                fail_on: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing_on(mut self, page: u32, error: SearchError) -> Self {
            self.fail_on = Some((page, error));
            self
        }

        fn requested(&self) -> Vec<u32> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchPageClient for ScriptedClient {
        async fn fetch_page(
            &self,
            _credential: &Credential,
            _store_number: &str,
            page: u32,
        ) -> Result<SearchPage, SearchError> {
            self.requests.lock().unwrap().push(page);
            if let Some((fail_page, error)) = &self.fail_on {
                if *fail_page == page {
                    return Err(error.clone());
                }
            }
            Ok(self.pages.get(page as usize).cloned().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn test_fetches_all_pages_in_order() {
        let client = Arc::new(ScriptedClient::new(vec![
            page(&["p1", "p2"], 0, 3, 5),
            page(&["p3", "p4"], 1, 3, 5),
            page(&["p5"], 2, 3, 5),
        ]));
        let fetcher = PaginatedFetcher::new(client.clone());
        let (reporter, mut rx) = ProgressReporter::channel();

        let catalog = fetcher
            .fetch_store(&credential(), "254", &reporter)
            .await
            .unwrap();

        assert_eq!(catalog.records.len(), 5);
        assert_eq!(catalog.batches, 3);
        assert_eq!(catalog.total_hits, 5);
        assert_eq!(client.requested(), vec![0, 1, 2]);

        drop(reporter);
        let mut currents = Vec::new();
        while let Some(p) = rx.recv().await {
            assert_eq!(p.phase, RefreshPhase::Fetching);
            currents.push(p.current);
        }
        assert_eq!(currents, vec![2, 4, 5]);
    }

    #[tokio::test]
    async fn test_failure_reports_completed_batches() {
        let client = Arc::new(
            ScriptedClient::new(vec![
                page(&["p1", "p2"], 0, 3, 5),
                page(&["p3", "p4"], 1, 3, 5),
            ])
            .failing_on(
                1,
                SearchError::Http {
                    status: 500,
                    message: "boom".to_string(),
                },
            ),
        );
        let fetcher = PaginatedFetcher::new(client);
        let reporter = ProgressReporter::disabled();

        let failure = fetcher
            .fetch_store(&credential(), "254", &reporter)
            .await
            .unwrap_err();

        assert_eq!(failure.batches_completed, 1);
        assert_eq!(failure.records_fetched, 2);
        assert_eq!(failure.error.status(), Some(500));
    }

    #[tokio::test]
    async fn test_empty_store_completes_with_no_batches() {
        let client = Arc::new(ScriptedClient::new(vec![page(&[], 0, 0, 0)]));
        let fetcher = PaginatedFetcher::new(client);

        let catalog = fetcher
            .fetch_store(&credential(), "254", &ProgressReporter::disabled())
            .await
            .unwrap();

        assert!(catalog.records.is_empty());
        assert_eq!(catalog.batches, 0);
    }

    #[tokio::test]
    async fn test_page_cap_stops_runaway_upstream() {
        let pages: Vec<SearchPage> = (0..10).map(|i| page(&["px"], i, 100, 1000)).collect();
        let client = Arc::new(ScriptedClient::new(pages));
        let fetcher = PaginatedFetcher::new(client.clone()).with_max_pages(3);

        let catalog = fetcher
            .fetch_store(&credential(), "254", &ProgressReporter::disabled())
            .await
            .unwrap();

        assert_eq!(catalog.batches, 3);
        assert_eq!(client.requested(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_refetch_restarts_from_page_zero() {
        let client = Arc::new(ScriptedClient::new(vec![
            page(&["p1"], 0, 2, 2),
            page(&["p2"], 1, 2, 2),
        ]));
        let fetcher = PaginatedFetcher::new(client.clone());
        let reporter = ProgressReporter::disabled();

        fetcher
            .fetch_store(&credential(), "254", &reporter)
            .await
            .unwrap();
        fetcher
            .fetch_store(&credential(), "254", &reporter)
            .await
            .unwrap();

        assert_eq!(client.requested(), vec![0, 1, 0, 1]);
    }
}
