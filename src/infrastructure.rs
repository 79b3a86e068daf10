//! Infrastructure layer for database connections and external integrations
//!
//! This module provides database connections, catalog persistence, credential
//! storage, and the search API integrations the refresh engine is built on.

pub mod catalog_fetcher;
pub mod catalog_repository;
pub mod config; // Configuration tiers and manager
pub mod credentials;
pub mod database_connection;
pub mod logging; // Logging infrastructure
pub mod search_client;
pub mod store_directory;

// Re-export commonly used items
pub use catalog_fetcher::{FetchFailure, FetchedCatalog, PaginatedFetcher};
pub use catalog_repository::{CatalogRepository, CommitOutcome};
pub use config::{AppConfig, ConfigManager};
pub use credentials::CredentialStore;
pub use database_connection::DatabaseConnection;
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use search_client::{HttpSearchClient, SearchClientConfig};
pub use store_directory::StoreDirectoryClient;
