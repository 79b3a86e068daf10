//! Concurrent multi-store refresh pool
//!
//! Fans a list of store numbers out to refresh workers under a fixed
//! concurrency cap. Every submitted store yields exactly one result, and
//! one store's terminal failure never cancels or blocks its siblings.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::application::refresh::RefreshOrchestrator;
use crate::domain::constants::refresh;
use crate::domain::error::RefreshError;
use crate::domain::events::{
    ProgressReporter, RefreshPhase, RefreshProgress, RefreshSummary, StoreRefreshResult,
};

/// Runs per-store refreshes concurrently with bounded parallelism
pub struct RefreshPool {
    orchestrator: Arc<RefreshOrchestrator>,
    max_workers: u32,
    cancellation_token: Option<CancellationToken>,
}

impl RefreshPool {
    pub fn new(orchestrator: Arc<RefreshOrchestrator>) -> Self {
        Self {
            orchestrator,
            max_workers: refresh::DEFAULT_MAX_WORKERS,
            cancellation_token: None,
        }
    }

    pub fn with_max_workers(mut self, max_workers: u32) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Stops admitting new stores once the token is cancelled. Stores
    /// already past the admission gate run to completion.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Refresh the given stores, at most `max_workers` at a time.
    ///
    /// Duplicate store numbers are collapsed before scheduling so no
    /// store is processed twice in one run.
    pub async fn refresh_stores(
        &self,
        store_numbers: &[String],
        reporter: &ProgressReporter,
    ) -> RefreshSummary {
        let stores = dedup_preserving_order(store_numbers);
        let total = stores.len() as u32;
        let mut summary = RefreshSummary {
            total_stores: total,
            ..Default::default()
        };
        if stores.is_empty() {
            warn!("⚠️ Refresh requested with no stores, nothing to do");
            return summary;
        }

        info!(
            "🚀 Refreshing {} stores with up to {} workers",
            total, self.max_workers
        );
        reporter.report(RefreshProgress::new(
            RefreshPhase::Planning,
            None,
            0,
            total,
            format!("Planning refresh for {total} stores"),
        ));

        let semaphore = Arc::new(Semaphore::new(self.max_workers as usize));
        let completed = Arc::new(AtomicU32::new(0));
        let mut scheduled = Vec::with_capacity(stores.len());
        let mut tasks = Vec::with_capacity(stores.len());

        for store_number in stores {
            let orchestrator = Arc::clone(&self.orchestrator);
            let permit = Arc::clone(&semaphore);
            let reporter = reporter.clone();
            let completed = Arc::clone(&completed);
            let token = self.cancellation_token.clone();
            let store = store_number.clone();

            let task = tokio::spawn(async move {
                let _permit = match permit.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return StoreRefreshResult::failed(
                            store,
                            RefreshError::Config("worker pool closed".to_string()),
                        );
                    }
                };

                if let Some(token) = &token {
                    if token.is_cancelled() {
                        warn!("🛑 Store {}: refresh cancelled before it started", store);
                        return StoreRefreshResult::failed(
                            store,
                            RefreshError::Config("refresh cancelled".to_string()),
                        );
                    }
                }

                let result = orchestrator.refresh_store(&store, &reporter).await;

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                reporter.report(RefreshProgress::new(
                    RefreshPhase::Committing,
                    None,
                    done,
                    total,
                    format!("{done} of {total} stores complete"),
                ));

                result
            });
            scheduled.push(store_number);
            tasks.push(task);
        }

        let results = futures::future::join_all(tasks).await;
        for (store_number, joined) in scheduled.into_iter().zip(results) {
            let result = match joined {
                Ok(result) => result,
                Err(join_error) => {
                    error!("❌ Store {} worker crashed: {}", store_number, join_error);
                    StoreRefreshResult::failed(
                        store_number,
                        RefreshError::Config(format!("worker crashed: {join_error}")),
                    )
                }
            };
            summary.record(result);
        }

        info!(
            "🎉 Refresh run complete: {} of {} stores succeeded, {} products committed",
            summary.succeeded, total, summary.products_added
        );
        summary
    }
}

/// First occurrence wins; scheduling order follows the caller's order.
fn dedup_preserving_order(store_numbers: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    store_numbers
        .iter()
        .filter(|store| seen.insert(store.as_str()))
        .cloned()
        .collect()
}
