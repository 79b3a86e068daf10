//! Collaborator contracts for the refresh pipeline
//!
//! The network-facing pieces are defined as traits so the orchestrator
//! can run against the real search API in production and against doubles
//! in tests. Callers pick the implementation; nothing here is patched at
//! runtime.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::SearchError;
use super::record::CatalogRecord;

/// A usable capability token for the search API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub api_key: String,
    pub app_id: String,
    pub extracted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// True once the upstream-declared expiry has passed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires <= now)
    }
}

/// Raw extraction output before it is persisted as a credential
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedCredential {
    pub api_key: String,
    pub app_id: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// One page of search results for a store-scoped query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub hits: Vec<CatalogRecord>,
    #[serde(rename = "nbHits", default)]
    pub total_hits: u32,
    #[serde(default)]
    pub page: u32,
    #[serde(rename = "nbPages", default)]
    pub total_pages: u32,
}

impl SearchPage {
    /// True when the upstream reports no page after this one
    pub fn is_last(&self) -> bool {
        self.hits.is_empty() || self.page + 1 >= self.total_pages
    }
}

/// One store-scoped page request against the remote search API
#[async_trait]
pub trait SearchPageClient: Send + Sync {
    /// Fetch a single result page for the given store
    async fn fetch_page(
        &self,
        credential: &Credential,
        store_number: &str,
        page: u32,
    ) -> Result<SearchPage, SearchError>;
}

/// Opaque credential recovery collaborator
///
/// The real implementation drives a browser session elsewhere; this crate
/// only sees the resulting key pair or the failure.
#[async_trait]
pub trait CredentialExtractor: Send + Sync {
    async fn extract(&self) -> anyhow::Result<ExtractedCredential>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_credential_expiry() {
        let now = Utc::now();
        let open_ended = Credential {
            api_key: "key".to_string(),
            app_id: "app".to_string(),
            extracted_at: now,
            expires_at: None,
        };
        assert!(!open_ended.is_expired(now + Duration::days(365)));

        let dated = Credential {
            expires_at: Some(now + Duration::hours(1)),
            ..open_ended
        };
        assert!(!dated.is_expired(now));
        assert!(dated.is_expired(now + Duration::hours(2)));
    }

    #[test]
    fn test_page_termination() {
        let record = CatalogRecord {
            object_id: "o1".to_string(),
            product_id: Some("p1".to_string()),
            ..CatalogRecord::default()
        };

        let mid = SearchPage {
            hits: vec![record.clone()],
            total_hits: 300,
            page: 1,
            total_pages: 3,
        };
        assert!(!mid.is_last());

        let last = SearchPage {
            hits: vec![record],
            total_hits: 300,
            page: 2,
            total_pages: 3,
        };
        assert!(last.is_last());

        let empty = SearchPage {
            hits: vec![],
            total_hits: 0,
            page: 0,
            total_pages: 0,
        };
        assert!(empty.is_last());
    }
}
