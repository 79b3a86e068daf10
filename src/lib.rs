//! ShelfSync - Grocery Catalog Synchronization Engine
//!
//! This library maintains local, per-store replicas of a grocery chain's
//! product catalog by paging through a third-party search API and
//! committing each store's records in one atomic transaction, together
//! with a derived category/tag ontology.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export the primary entry points for easier access
pub use application::SyncEngine;
pub use domain::events::{ProgressReporter, RefreshProgress, RefreshSummary};
pub use infrastructure::{ConfigManager, DatabaseConnection};
