//! Store directory bootstrap
//!
//! The directory endpoint returns the full store list in one flat,
//! unauthenticated response; syncing it upserts descriptive fields
//! without touching any store's catalog freshness stamp.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::domain::catalog::Store;
use crate::domain::constants::{api, refresh};

use super::catalog_repository::CatalogRepository;

/// One store record as the directory API serves it
#[derive(Debug, Clone, Deserialize)]
struct DirectoryStore {
    #[serde(rename = "storeNumber")]
    store_number: String,
    name: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    pickup: bool,
    #[serde(default)]
    delivery: bool,
}

impl From<DirectoryStore> for Store {
    fn from(dir: DirectoryStore) -> Self {
        Store {
            store_number: dir.store_number,
            name: dir.name,
            latitude: dir.latitude,
            longitude: dir.longitude,
            has_pickup: dir.pickup,
            has_delivery: dir.delivery,
            last_updated: None,
        }
    }
}

pub struct StoreDirectoryClient {
    client: Client,
    endpoint: String,
}

impl StoreDirectoryClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        url::Url::parse(&endpoint)
            .with_context(|| format!("Invalid store directory endpoint: {endpoint}"))?;

        let client = Client::builder()
            .timeout(Duration::from_millis(refresh::DEFAULT_REQUEST_TIMEOUT_MS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, endpoint })
    }

    pub fn with_default_endpoint() -> Result<Self> {
        Self::new(api::STORE_DIRECTORY_ENDPOINT)
    }

    /// Fetch the flat store list
    pub async fn fetch_stores(&self) -> Result<Vec<Store>> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .with_context(|| format!("Failed to fetch store directory: {}", self.endpoint))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Store directory request failed with status {}",
                response.status()
            );
        }

        let stores: Vec<DirectoryStore> = response
            .json()
            .await
            .context("Failed to decode store directory response")?;

        Ok(stores.into_iter().map(Store::from).collect())
    }

    /// Fetch the directory and upsert every store, returning the count
    pub async fn sync_stores(&self, repository: &CatalogRepository) -> Result<u32> {
        let stores = self.fetch_stores().await?;
        let mut synced = 0u32;
        for store in &stores {
            repository.upsert_store(store).await?;
            synced += 1;
        }
        info!("🏬 Synced {} stores from the directory", synced);
        Ok(synced)
    }
}
