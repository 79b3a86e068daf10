//! Single-store refresh orchestration
//!
//! Drives one store's catalog refresh end to end: credential acquisition,
//! paginated fetch, then one atomic commit. The fetch phase completes fully
//! in memory before the commit phase opens a write transaction, so the
//! storage critical section never overlaps network waits.
//!
//! Auth failures (401/403) invalidate the stored credential and retry the
//! whole fetch-and-commit sequence exactly once; a second auth failure is
//! terminal. Every other failure is terminal immediately.

use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::constants::refresh;
use crate::domain::error::RefreshError;
use crate::domain::events::{ProgressReporter, RefreshPhase, RefreshProgress, StoreRefreshResult};
use crate::domain::services::CredentialExtractor;
use crate::infrastructure::catalog_fetcher::PaginatedFetcher;
use crate::infrastructure::catalog_repository::{CatalogRepository, CommitOutcome};
use crate::infrastructure::credentials::CredentialStore;

/// Lifecycle states of a single store refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Fetching,
    Committing,
    AuthRetry,
    Done,
    Failed,
}

impl std::fmt::Display for RefreshState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RefreshState::Idle => "idle",
            RefreshState::Fetching => "fetching",
            RefreshState::Committing => "committing",
            RefreshState::AuthRetry => "auth-retry",
            RefreshState::Done => "done",
            RefreshState::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Orchestrates the fetch-and-commit sequence for individual stores
pub struct RefreshOrchestrator {
    credentials: CredentialStore,
    fetcher: PaginatedFetcher,
    repository: CatalogRepository,
    extractor: Arc<dyn CredentialExtractor>,
}

impl RefreshOrchestrator {
    pub fn new(
        credentials: CredentialStore,
        fetcher: PaginatedFetcher,
        repository: CatalogRepository,
        extractor: Arc<dyn CredentialExtractor>,
    ) -> Self {
        Self {
            credentials,
            fetcher,
            repository,
            extractor,
        }
    }

    /// Refresh a single store's catalog replica.
    ///
    /// Never propagates an error: every outcome, success or terminal
    /// failure, is folded into the returned result.
    pub async fn refresh_store(
        &self,
        store_number: &str,
        reporter: &ProgressReporter,
    ) -> StoreRefreshResult {
        let run_id = Uuid::new_v4();
        info!(
            "🚀 [{}] Starting catalog refresh for store {}",
            run_id, store_number
        );

        let mut auth_retries = 0u32;
        loop {
            match self.run_once(store_number, reporter).await {
                Ok(outcome) => {
                    debug!(
                        "[{}] Store {} state -> {}",
                        run_id,
                        store_number,
                        RefreshState::Done
                    );
                    info!(
                        "✅ [{}] Store {} refreshed: {} products committed, {} records dropped",
                        run_id, store_number, outcome.products_added, outcome.records_dropped
                    );
                    return StoreRefreshResult::succeeded(
                        store_number.to_string(),
                        outcome.products_added,
                        outcome.records_dropped,
                    );
                }
                Err(err) if err.is_auth() && auth_retries < refresh::AUTH_RETRY_LIMIT => {
                    auth_retries += 1;
                    debug!(
                        "[{}] Store {} state -> {}",
                        run_id,
                        store_number,
                        RefreshState::AuthRetry
                    );
                    warn!(
                        "🔑 [{}] Store {}: auth failure (status {:?}), invalidating credential and retrying",
                        run_id,
                        store_number,
                        err.status()
                    );
                    if let Err(revoke_err) = self.credentials.invalidate().await {
                        error!(
                            "❌ [{}] Store {}: credential invalidation failed: {}",
                            run_id, store_number, revoke_err
                        );
                        return StoreRefreshResult::failed(store_number.to_string(), revoke_err);
                    }
                }
                Err(err) => {
                    debug!(
                        "[{}] Store {} state -> {}",
                        run_id,
                        store_number,
                        RefreshState::Failed
                    );
                    error!(
                        "❌ [{}] Store {} refresh failed: {}",
                        run_id, store_number, err
                    );
                    return StoreRefreshResult::failed(store_number.to_string(), err);
                }
            }
        }
    }

    /// One pass of the state machine: ensure credential, fetch, commit.
    async fn run_once(
        &self,
        store_number: &str,
        reporter: &ProgressReporter,
    ) -> Result<CommitOutcome, RefreshError> {
        reporter.report(RefreshProgress::new(
            RefreshPhase::Planning,
            Some(store_number.to_string()),
            0,
            0,
            format!("Store {store_number}: acquiring credential"),
        ));
        let credential = self.credentials.ensure(self.extractor.as_ref()).await?;

        debug!("Store {} state -> {}", store_number, RefreshState::Fetching);
        let catalog = self
            .fetcher
            .fetch_store(&credential, store_number, reporter)
            .await
            .map_err(|failure| {
                warn!(
                    "⚠️ Store {}: fetch aborted after {} complete batches ({} records)",
                    store_number, failure.batches_completed, failure.records_fetched
                );
                RefreshError::from(failure.error)
            })?;

        debug!(
            "Store {} state -> {} ({} records over {} batches)",
            store_number,
            RefreshState::Committing,
            catalog.records.len(),
            catalog.batches
        );
        let record_count = catalog.records.len() as u32;
        reporter.report(RefreshProgress::new(
            RefreshPhase::Committing,
            Some(store_number.to_string()),
            record_count,
            record_count.max(1),
            format!("Store {store_number}: committing {record_count} records"),
        ));

        self.repository
            .commit_catalog(store_number, &catalog.records)
            .await
    }
}
