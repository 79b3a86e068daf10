//! Repository for catalog persistence
//!
//! All writes for one store refresh go through `commit_catalog`, which
//! applies the store's record set, the wholesale ontology rebuild and the
//! freshness stamp inside a single transaction. Upserts replace on
//! conflict by primary key, so re-applying a record set is a no-op.
//! SQLite is effectively single-writer; workers serialize at the
//! transaction boundary and transient lock conflicts are retried with a
//! jittered backoff instead of surfacing to the caller.

#![allow(clippy::uninlined_format_args)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

use crate::domain::catalog::{
    CatalogStatus, CategoryNode, Product, Store, TagEntry, TagType, is_stale,
};
use crate::domain::constants::database::{COMMIT_RETRY_ATTEMPTS, COMMIT_RETRY_BACKOFF_MS};
use crate::domain::constants::settings;
use crate::domain::error::RefreshError;
use crate::domain::ontology::OntologyBuilder;
use crate::domain::record::{CatalogRecord, CatalogRows};

/// What one store commit applied
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub store_number: String,
    /// Distinct products written in this commit
    pub products_added: u32,
    /// Records dropped at validation (no product identifier)
    pub records_dropped: u32,
    pub committed_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct CatalogRepository {
    pool: Arc<SqlitePool>,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    // ===============================
    // CATALOG COMMIT
    // ===============================

    /// Apply one store's fetched record set atomically.
    ///
    /// Either every derived row lands together with the ontology rebuild
    /// and the store's freshness stamp, or none of it does. A fetch that
    /// produced zero records still commits the stamp so the store stops
    /// counting as stale.
    pub async fn commit_catalog(
        &self,
        store_number: &str,
        records: &[CatalogRecord],
    ) -> Result<CommitOutcome, RefreshError> {
        if records.is_empty() {
            warn!(
                "⚠️ Store {}: committing an empty catalog (stamp only)",
                store_number
            );
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.try_commit(store_number, records).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if is_transient_lock_error(&e) && attempt < COMMIT_RETRY_ATTEMPTS => {
                    let backoff = COMMIT_RETRY_BACKOFF_MS * u64::from(attempt)
                        + fastrand::u64(0..COMMIT_RETRY_BACKOFF_MS);
                    warn!(
                        "🔄 Store {}: commit hit a lock conflict (attempt {}), retrying in {}ms",
                        store_number, attempt, backoff
                    );
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => return Err(RefreshError::CommitFailed(e.to_string())),
            }
        }
    }

    async fn try_commit(
        &self,
        store_number: &str,
        records: &[CatalogRecord],
    ) -> Result<CommitOutcome, sqlx::Error> {
        let now = Utc::now();

        let mut records_dropped = 0u32;
        let mut product_ids: HashSet<String> = HashSet::new();
        let mut batch: Vec<CatalogRows> = Vec::with_capacity(records.len());
        for record in records.iter().cloned() {
            match record.into_rows(store_number, now) {
                Some(rows) => {
                    product_ids.insert(rows.product.product_id.clone());
                    batch.push(rows);
                }
                None => records_dropped += 1,
            }
        }

        let mut tx = self.pool.begin().await?;

        // Store row exists before any store_products reference it
        sqlx::query("INSERT OR IGNORE INTO stores (store_number) VALUES (?)")
            .bind(store_number)
            .execute(&mut *tx)
            .await?;

        for rows in &batch {
            let product = &rows.product;
            // True upsert: REPLACE would delete the row first and cascade
            // away other stores' store_products references
            sqlx::query(
                r#"
                INSERT INTO products
                (product_id, name, brand, description, size, upc, category_path,
                 filter_tags, nutrition_tags, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(product_id) DO UPDATE SET
                    name = excluded.name,
                    brand = excluded.brand,
                    description = excluded.description,
                    size = excluded.size,
                    upc = excluded.upc,
                    category_path = excluded.category_path,
                    filter_tags = excluded.filter_tags,
                    nutrition_tags = excluded.nutrition_tags,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&product.product_id)
            .bind(&product.name)
            .bind(&product.brand)
            .bind(&product.description)
            .bind(&product.size)
            .bind(&product.upc)
            .bind(&product.category_path)
            .bind(serde_json::to_string(&product.filter_tags).unwrap_or_else(|_| "[]".to_string()))
            .bind(
                serde_json::to_string(&product.nutrition_tags).unwrap_or_else(|_| "[]".to_string()),
            )
            .bind(product.updated_at)
            .execute(&mut *tx)
            .await?;

            let sp = &rows.store_product;
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO store_products
                (product_id, store_number, price, sale_price, aisle, shelf, available, last_updated)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&sp.product_id)
            .bind(&sp.store_number)
            .bind(sp.price)
            .bind(sp.sale_price)
            .bind(&sp.aisle)
            .bind(&sp.shelf)
            .bind(sp.available)
            .bind(sp.last_updated)
            .execute(&mut *tx)
            .await?;

            if let Some(serving) = &rows.serving {
                sqlx::query(
                    r#"
                    INSERT OR REPLACE INTO servings
                    (product_id, size, size_uom, servings_per_container)
                    VALUES (?, ?, ?, ?)
                    "#,
                )
                .bind(&serving.product_id)
                .bind(serving.size)
                .bind(&serving.size_uom)
                .bind(serving.servings_per_container)
                .execute(&mut *tx)
                .await?;
            }

            for fact in &rows.nutrition_facts {
                sqlx::query(
                    r#"
                    INSERT OR REPLACE INTO nutrition_facts
                    (product_id, name, amount, uom, category, daily_value)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&fact.product_id)
                .bind(&fact.name)
                .bind(fact.amount)
                .bind(&fact.uom)
                .bind(fact.category.as_str())
                .bind(fact.daily_value)
                .execute(&mut *tx)
                .await?;
            }
        }

        Self::rebuild_ontology(&mut tx).await?;

        sqlx::query("UPDATE stores SET last_updated = ? WHERE store_number = ?")
            .bind(now)
            .bind(store_number)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(
            "Store {}: committed {} products ({} records dropped)",
            store_number,
            product_ids.len(),
            records_dropped
        );

        Ok(CommitOutcome {
            store_number: store_number.to_string(),
            products_added: product_ids.len() as u32,
            records_dropped,
            committed_at: now,
        })
    }

    /// Recompute the derived category tree and tag counts from every
    /// currently-known product and replace the stored aggregates.
    async fn rebuild_ontology(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    ) -> Result<(), sqlx::Error> {
        let rows = sqlx::query(
            "SELECT product_id, category_path, filter_tags, nutrition_tags FROM products",
        )
        .fetch_all(&mut **tx)
        .await?;

        let mut builder = OntologyBuilder::new();
        for row in &rows {
            let product_id: String = row.get("product_id");
            let category_path: Option<String> = row.get("category_path");
            let filter_tags = decode_tags(row.get("filter_tags"));
            let nutrition_tags = decode_tags(row.get("nutrition_tags"));
            builder.observe(
                &product_id,
                category_path.as_deref(),
                &filter_tags,
                &nutrition_tags,
            );
        }
        let snapshot = builder.snapshot();

        sqlx::query("DELETE FROM categories").execute(&mut **tx).await?;
        sqlx::query("DELETE FROM tags").execute(&mut **tx).await?;

        for node in &snapshot.categories {
            sqlx::query(
                "INSERT INTO categories (path, name, level, product_count) VALUES (?, ?, ?, ?)",
            )
            .bind(&node.path)
            .bind(&node.name)
            .bind(node.level)
            .bind(node.product_count)
            .execute(&mut **tx)
            .await?;
        }
        for tag in &snapshot.tags {
            sqlx::query("INSERT INTO tags (name, tag_type, product_count) VALUES (?, ?, ?)")
                .bind(&tag.name)
                .bind(tag.tag_type.as_str())
                .bind(tag.product_count)
                .execute(&mut **tx)
                .await?;
        }

        Ok(())
    }

    // ===============================
    // STATUS QUERIES
    // ===============================

    /// Freshness snapshot for one store's catalog
    pub async fn catalog_status(&self, store_number: &str) -> Result<CatalogStatus> {
        let count: i64 =
            sqlx::query("SELECT COUNT(*) AS n FROM store_products WHERE store_number = ?")
                .bind(store_number)
                .fetch_one(&*self.pool)
                .await?
                .get("n");

        let last_updated: Option<DateTime<Utc>> =
            sqlx::query("SELECT last_updated FROM stores WHERE store_number = ?")
                .bind(store_number)
                .fetch_optional(&*self.pool)
                .await?
                .and_then(|row| row.get("last_updated"));

        Ok(CatalogStatus {
            store_number: store_number.to_string(),
            is_empty: count == 0,
            is_stale: is_stale(last_updated, Utc::now()),
            product_count: count as u32,
            last_updated,
        })
    }

    pub async fn get_product(&self, product_id: &str) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT product_id, name, brand, description, size, upc, category_path,
                   filter_tags, nutrition_tags, updated_at
            FROM products WHERE product_id = ?
            "#,
        )
        .bind(product_id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.map(|row| Product {
            product_id: row.get("product_id"),
            name: row.get("name"),
            brand: row.get("brand"),
            description: row.get("description"),
            size: row.get("size"),
            upc: row.get("upc"),
            category_path: row.get("category_path"),
            filter_tags: decode_tags(row.get("filter_tags")),
            nutrition_tags: decode_tags(row.get("nutrition_tags")),
            updated_at: row.get("updated_at"),
        }))
    }

    // ===============================
    // STORE OPERATIONS
    // ===============================

    /// Upsert a store from the directory listing.
    ///
    /// The catalog freshness stamp is deliberately left alone: directory
    /// data says nothing about how old the store's products are.
    pub async fn upsert_store(&self, store: &Store) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stores (store_number, name, latitude, longitude, has_pickup, has_delivery)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(store_number) DO UPDATE SET
                name = excluded.name,
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                has_pickup = excluded.has_pickup,
                has_delivery = excluded.has_delivery
            "#,
        )
        .bind(&store.store_number)
        .bind(&store.name)
        .bind(store.latitude)
        .bind(store.longitude)
        .bind(store.has_pickup)
        .bind(store.has_delivery)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_store(&self, store_number: &str) -> Result<Option<Store>> {
        let row = sqlx::query(
            r#"
            SELECT store_number, name, latitude, longitude, has_pickup, has_delivery, last_updated
            FROM stores WHERE store_number = ?
            "#,
        )
        .bind(store_number)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.map(|row| Self::row_to_store(&row)))
    }

    pub async fn list_stores(&self) -> Result<Vec<Store>> {
        let rows = sqlx::query(
            r#"
            SELECT store_number, name, latitude, longitude, has_pickup, has_delivery, last_updated
            FROM stores ORDER BY store_number ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows.iter().map(Self::row_to_store).collect())
    }

    fn row_to_store(row: &SqliteRow) -> Store {
        Store {
            store_number: row.get("store_number"),
            name: row.get("name"),
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
            has_pickup: row.get("has_pickup"),
            has_delivery: row.get("has_delivery"),
            last_updated: row.get("last_updated"),
        }
    }

    // ===============================
    // ONTOLOGY QUERIES
    // ===============================

    pub async fn get_category(&self, path: &str) -> Result<Option<CategoryNode>> {
        let row = sqlx::query(
            "SELECT path, name, level, product_count FROM categories WHERE path = ?",
        )
        .bind(path)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.map(|row| CategoryNode {
            path: row.get("path"),
            name: row.get("name"),
            level: row.get("level"),
            product_count: row.get("product_count"),
        }))
    }

    pub async fn get_tag(&self, name: &str, tag_type: TagType) -> Result<Option<TagEntry>> {
        let row = sqlx::query(
            "SELECT name, tag_type, product_count FROM tags WHERE name = ? AND tag_type = ?",
        )
        .bind(name)
        .bind(tag_type.as_str())
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.map(|row| TagEntry {
            name: row.get("name"),
            tag_type: TagType::parse(row.get::<String, _>("tag_type").as_str()),
            product_count: row.get("product_count"),
        }))
    }

    /// Largest categories first, for status displays
    pub async fn top_categories(&self, limit: u32) -> Result<Vec<CategoryNode>> {
        let rows = sqlx::query(
            r#"
            SELECT path, name, level, product_count
            FROM categories ORDER BY product_count DESC, path ASC LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CategoryNode {
                path: row.get("path"),
                name: row.get("name"),
                level: row.get("level"),
                product_count: row.get("product_count"),
            })
            .collect())
    }

    // ===============================
    // SETTINGS
    // ===============================

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO settings (key, value, updated_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.map(|row| row.get("value")))
    }

    pub async fn set_active_store(&self, store_number: &str) -> Result<()> {
        // Activation counts as first reference, the store row may not exist yet
        sqlx::query("INSERT OR IGNORE INTO stores (store_number) VALUES (?)")
            .bind(store_number)
            .execute(&*self.pool)
            .await?;
        self.set_setting(settings::ACTIVE_STORE, store_number).await
    }

    pub async fn active_store(&self) -> Result<Option<String>> {
        self.get_setting(settings::ACTIVE_STORE).await
    }

    pub async fn mark_refreshed(&self, at: DateTime<Utc>) -> Result<()> {
        self.set_setting(settings::LAST_REFRESH, &at.to_rfc3339())
            .await
    }
}

fn decode_tags(raw: String) -> Vec<String> {
    serde_json::from_str(&raw).unwrap_or_default()
}

fn is_transient_lock_error(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => {
            let message = db.message().to_lowercase();
            message.contains("locked") || message.contains("busy")
        }
        _ => false,
    }
}
