//! Domain module - Core business logic and entities
//!
//! This module contains the catalog entities, wire records, failure
//! taxonomy, progress events and the pure ontology aggregation that the
//! rest of the engine is built around.
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod catalog;
pub mod constants;
pub mod error;
pub mod events;
pub mod ontology;
pub mod record;
pub mod services;

// Re-export commonly used items for convenience
// Note: Be specific about re-exports to avoid ambiguous glob warnings
pub use catalog::{
    CatalogStatus, CategoryNode, NutrientCategory, NutritionFact, Product, Serving, Store,
    StoreProduct, TagEntry, TagType,
};
pub use error::{RefreshError, SearchError, is_auth_status};
pub use events::{
    ProgressReporter, RefreshPhase, RefreshProgress, RefreshSummary, StoreRefreshResult,
};
pub use ontology::{OntologyBuilder, OntologySnapshot};
pub use record::{CatalogRecord, CatalogRows, CategoryLevels, NutrientInfo, ServingInfo};
pub use services::{
    Credential, CredentialExtractor, ExtractedCredential, SearchPage, SearchPageClient,
};
