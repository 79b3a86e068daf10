//! Progress and result types for refresh runs
//!
//! Refresh progress flows to the caller over an explicit channel rather
//! than a callback: the pool and orchestrator push `RefreshProgress`
//! values through a `ProgressReporter`, and the caller consumes the
//! receiving end at its own pace. Messages are emitted in the order the
//! phases occur and `current` never decreases within a phase.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::error::RefreshError;

/// Phase of a refresh run a progress message belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RefreshPhase {
    /// Resolving which stores to refresh
    Planning,
    /// Driving paginated fetches for a store
    Fetching,
    /// Applying fetched records inside a storage transaction
    Committing,
}

impl std::fmt::Display for RefreshPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshPhase::Planning => write!(f, "planning"),
            RefreshPhase::Fetching => write!(f, "fetching"),
            RefreshPhase::Committing => write!(f, "committing"),
        }
    }
}

/// One progress update from a refresh run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshProgress {
    pub phase: RefreshPhase,
    /// Store the update refers to; absent for run-level summaries
    pub store_number: Option<String>,
    /// Records fetched so far, or stores completed for run-level updates
    pub current: u32,
    /// Known total, 0 while the upstream has not reported one yet
    pub total: u32,
    /// Progress percentage (0.0 to 100.0)
    pub percentage: f64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl RefreshProgress {
    pub fn new(
        phase: RefreshPhase,
        store_number: Option<String>,
        current: u32,
        total: u32,
        message: impl Into<String>,
    ) -> Self {
        let mut progress = Self {
            phase,
            store_number,
            current,
            total,
            percentage: 0.0,
            message: message.into(),
            timestamp: Utc::now(),
        };
        progress.calculate_derived_fields();
        progress
    }

    /// Recalculate percentage and stamp the update time
    pub fn calculate_derived_fields(&mut self) {
        if self.total > 0 {
            self.percentage = (f64::from(self.current) / f64::from(self.total)) * 100.0;
        } else {
            self.percentage = 0.0;
        }
        self.timestamp = Utc::now();
    }
}

/// Outcome of one store's refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreRefreshResult {
    #[serde(rename = "storeNumber")]
    pub store_number: String,
    pub success: bool,
    /// Distinct products committed for this store
    #[serde(rename = "productsAdded")]
    pub products_added: u32,
    /// Records dropped during validation (missing product identifier)
    #[serde(rename = "recordsDropped")]
    pub records_dropped: u32,
    pub error: Option<RefreshError>,
    /// HTTP status of the terminal failure, if it carried one
    pub status: Option<u16>,
}

impl StoreRefreshResult {
    pub fn succeeded(store_number: String, products_added: u32, records_dropped: u32) -> Self {
        Self {
            store_number,
            success: true,
            products_added,
            records_dropped,
            error: None,
            status: None,
        }
    }

    pub fn failed(store_number: String, error: RefreshError) -> Self {
        let status = error.status();
        Self {
            store_number,
            success: false,
            products_added: 0,
            records_dropped: 0,
            error: Some(error),
            status,
        }
    }
}

/// Aggregate outcome of a multi-store refresh run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshSummary {
    #[serde(rename = "totalStores")]
    pub total_stores: u32,
    pub succeeded: u32,
    pub failed: u32,
    #[serde(rename = "productsAdded")]
    pub products_added: u32,
    /// Per-store results keyed by store number, one entry per submitted store
    pub results: HashMap<String, StoreRefreshResult>,
}

impl RefreshSummary {
    pub fn record(&mut self, result: StoreRefreshResult) {
        if result.success {
            self.succeeded += 1;
            self.products_added += result.products_added;
        } else {
            self.failed += 1;
        }
        self.results.insert(result.store_number.clone(), result);
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Sending side of the progress channel.
///
/// Consecutive identical updates (same phase, store and message) are
/// emitted once, so a slow consumer never sees a burst of duplicates.
/// Reporting never blocks and silently drops updates once the receiving
/// side has gone away.
#[derive(Clone)]
pub struct ProgressReporter {
    sender: Option<UnboundedSender<RefreshProgress>>,
    last_key: Arc<Mutex<Option<String>>>,
}

impl ProgressReporter {
    pub fn new(sender: UnboundedSender<RefreshProgress>) -> Self {
        Self {
            sender: Some(sender),
            last_key: Arc::new(Mutex::new(None)),
        }
    }

    /// Reporter that discards everything, for callers without a consumer
    pub fn disabled() -> Self {
        Self {
            sender: None,
            last_key: Arc::new(Mutex::new(None)),
        }
    }

    /// Fresh reporter plus the receiving end of its channel
    pub fn channel() -> (Self, UnboundedReceiver<RefreshProgress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn report(&self, progress: RefreshProgress) {
        let Some(sender) = &self.sender else {
            return;
        };

        let key = format!(
            "{}|{}|{}|{}",
            progress.phase,
            progress.store_number.as_deref().unwrap_or(""),
            progress.current,
            progress.message
        );
        {
            let mut last = self.last_key.lock().unwrap_or_else(|e| e.into_inner());
            if last.as_deref() == Some(key.as_str()) {
                return;
            }
            *last = Some(key);
        }

        if sender.send(progress).is_err() {
            tracing::debug!("Progress receiver dropped, update discarded");
        }
    }
}
