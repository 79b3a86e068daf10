//! HTTP client for the remote search API with rate limiting
//!
//! One instance is shared by all refresh workers; the governor limiter
//! keeps the combined request rate against the search endpoint bounded
//! no matter how many stores are in flight.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, USER_AGENT},
};

use crate::domain::constants::{api, refresh};
use crate::domain::error::SearchError;
use crate::domain::services::{Credential, SearchPage, SearchPageClient};

/// Configuration for the search API client
#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchClientConfig {
    pub endpoint: String,
    /// Query text sent with every page request, usually empty to match
    /// the whole catalog
    pub query: String,
    pub hits_per_page: u32,
    pub timeout_ms: u64,
    pub max_requests_per_second: u32,
}

impl Default for SearchClientConfig {
    fn default() -> Self {
        Self {
            endpoint: api::SEARCH_ENDPOINT.to_string(),
            query: String::new(),
            hits_per_page: api::HITS_PER_PAGE,
            timeout_ms: refresh::DEFAULT_REQUEST_TIMEOUT_MS,
            max_requests_per_second: refresh::DEFAULT_REQUESTS_PER_SECOND,
        }
    }
}

/// Network-backed implementation of `SearchPageClient`
pub struct HttpSearchClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    config: SearchClientConfig,
}

impl HttpSearchClient {
    pub fn new(config: SearchClientConfig) -> Result<Self> {
        url::Url::parse(&config.endpoint)
            .with_context(|| format!("Invalid search endpoint: {}", config.endpoint))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static("shelfsync/0.3 (catalog sync)"),
        );

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .context("Rate limit must be greater than 0")?,
        );
        let rate_limiter = RateLimiter::direct(quota);

        Ok(Self {
            client,
            rate_limiter,
            config,
        })
    }

    pub fn config(&self) -> &SearchClientConfig {
        &self.config
    }
}

#[async_trait]
impl SearchPageClient for HttpSearchClient {
    async fn fetch_page(
        &self,
        credential: &Credential,
        store_number: &str,
        page: u32,
    ) -> Result<SearchPage, SearchError> {
        // Wait for rate limiter
        self.rate_limiter.until_ready().await;

        let body = serde_json::json!({
            "query": self.config.query,
            "filters": format!("storeNumber:{store_number}"),
            "page": page,
            "hitsPerPage": self.config.hits_per_page,
        });

        tracing::debug!("Fetching store {} page {}", store_number, page);

        let response = self
            .client
            .post(&self.config.endpoint)
            .header(api::APP_ID_HEADER, &credential.app_id)
            .header(api::API_KEY_HEADER, &credential.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(200)
                .collect();
            return Err(SearchError::Http {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<SearchPage>()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))
    }
}

fn classify_transport_error(e: reqwest::Error) -> SearchError {
    if e.is_timeout() {
        SearchError::Network(format!("request timed out: {e}"))
    } else {
        SearchError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_search_client_creation() {
        let config = SearchClientConfig::default();
        let client = HttpSearchClient::new(config);
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_endpoint_rejected() {
        let config = SearchClientConfig {
            endpoint: "not a url".to_string(),
            ..Default::default()
        };
        assert!(HttpSearchClient::new(config).is_err());
    }

    #[tokio::test]
    async fn test_zero_rate_limit_rejected() {
        let config = SearchClientConfig {
            max_requests_per_second: 0,
            ..Default::default()
        };
        assert!(HttpSearchClient::new(config).is_err());
    }

    #[test]
    fn test_default_config_matches_policy() {
        let config = SearchClientConfig::default();
        assert_eq!(config.hits_per_page, api::HITS_PER_PAGE);
        assert!(config.query.is_empty());
    }
}
