//! Engine facade wiring configuration, storage and the refresh pipeline
//!
//! `SyncEngine` is the composition root: it builds the search client,
//! credential store, fetcher, orchestrator and worker pool from an
//! `AppConfig` plus an open database connection, and exposes the
//! store-directory sync and catalog refresh entry points.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::pool::RefreshPool;
use crate::application::refresh::RefreshOrchestrator;
use crate::domain::catalog::CatalogStatus;
use crate::domain::error::RefreshError;
use crate::domain::events::{ProgressReporter, RefreshSummary, StoreRefreshResult};
use crate::domain::services::{CredentialExtractor, SearchPageClient};
use crate::infrastructure::catalog_fetcher::PaginatedFetcher;
use crate::infrastructure::catalog_repository::CatalogRepository;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::credentials::CredentialStore;
use crate::infrastructure::database_connection::DatabaseConnection;
use crate::infrastructure::search_client::{HttpSearchClient, SearchClientConfig};
use crate::infrastructure::store_directory::StoreDirectoryClient;

/// Catalog synchronization engine
pub struct SyncEngine {
    config: AppConfig,
    repository: CatalogRepository,
    directory: StoreDirectoryClient,
    pool: RefreshPool,
}

impl SyncEngine {
    /// Build an engine talking to the configured search API.
    pub fn new(
        config: AppConfig,
        db: &DatabaseConnection,
        extractor: Arc<dyn CredentialExtractor>,
    ) -> Result<Self> {
        let client_config = SearchClientConfig {
            endpoint: config.advanced.search_endpoint.clone(),
            query: config.advanced.search_query.clone(),
            hits_per_page: config.user.hits_per_page,
            timeout_ms: config.advanced.request_timeout_ms,
            max_requests_per_second: config.advanced.max_requests_per_second,
        };
        let client: Arc<dyn SearchPageClient> = Arc::new(HttpSearchClient::new(client_config)?);
        Self::from_parts(config, db, client, extractor)
    }

    /// Build an engine around an injected page client.
    pub fn from_parts(
        config: AppConfig,
        db: &DatabaseConnection,
        client: Arc<dyn SearchPageClient>,
        extractor: Arc<dyn CredentialExtractor>,
    ) -> Result<Self> {
        config.validate()?;

        let repository = CatalogRepository::new(db.pool().clone());
        let credentials = CredentialStore::new(db.pool().clone()).with_extraction_timeout(
            Duration::from_secs(config.advanced.extraction_timeout_secs),
        );
        let fetcher =
            PaginatedFetcher::new(client).with_max_pages(config.advanced.max_pages_per_store);
        let orchestrator = Arc::new(RefreshOrchestrator::new(
            credentials,
            fetcher,
            repository.clone(),
            extractor,
        ));
        let pool = RefreshPool::new(orchestrator).with_max_workers(config.user.max_workers);
        let directory = StoreDirectoryClient::new(&config.advanced.store_directory_endpoint)?;

        Ok(Self {
            config,
            repository,
            directory,
            pool,
        })
    }

    /// Stop admitting new stores to refresh runs once the token fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.pool = self.pool.with_cancellation(token);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn repository(&self) -> &CatalogRepository {
        &self.repository
    }

    /// Pull the store directory and upsert every store row.
    pub async fn sync_store_directory(&self) -> Result<u32> {
        self.directory.sync_stores(&self.repository).await
    }

    /// Refresh the given stores concurrently and stamp the run time when
    /// at least one store committed.
    pub async fn refresh_stores(
        &self,
        store_numbers: &[String],
        reporter: &ProgressReporter,
    ) -> RefreshSummary {
        let summary = self.pool.refresh_stores(store_numbers, reporter).await;

        if summary.succeeded > 0 {
            if let Err(e) = self.repository.mark_refreshed(Utc::now()).await {
                warn!("⚠️ Failed to stamp last refresh time: {}", e);
            }
        }

        summary
    }

    /// Refresh a single store through the same pool path as batch runs.
    pub async fn refresh_store(
        &self,
        store_number: &str,
        reporter: &ProgressReporter,
    ) -> StoreRefreshResult {
        let stores = [store_number.to_string()];
        let mut summary = self.refresh_stores(&stores, reporter).await;
        summary.results.remove(store_number).unwrap_or_else(|| {
            StoreRefreshResult::failed(
                store_number.to_string(),
                RefreshError::Config("pool returned no result".to_string()),
            )
        })
    }

    /// Refresh only the stores whose replica is empty or stale.
    pub async fn refresh_if_stale(
        &self,
        store_numbers: &[String],
        reporter: &ProgressReporter,
    ) -> Result<RefreshSummary> {
        let mut due = Vec::new();
        for store_number in store_numbers {
            let status = self.repository.catalog_status(store_number).await?;
            if status.needs_refresh() {
                due.push(store_number.clone());
            } else {
                info!(
                    "✅ Store {} is fresh ({} products), skipping",
                    store_number, status.product_count
                );
            }
        }

        if due.is_empty() {
            info!(
                "🎉 All {} stores are fresh, nothing to refresh",
                store_numbers.len()
            );
            return Ok(RefreshSummary::default());
        }

        Ok(self.refresh_stores(&due, reporter).await)
    }

    /// Catalog status for one store.
    pub async fn status(&self, store_number: &str) -> Result<CatalogStatus> {
        self.repository.catalog_status(store_number).await
    }

    pub async fn set_active_store(&self, store_number: &str) -> Result<()> {
        self.repository.set_active_store(store_number).await
    }

    pub async fn active_store(&self) -> Result<Option<String>> {
        self.repository.active_store().await
    }
}
