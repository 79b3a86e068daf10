// Database connection and pool management
// This module handles SQLite database connections using sqlx

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::constants::database::{BUSY_TIMEOUT_MS, DEFAULT_CONNECTION_POOL_SIZE};

/// Owner of the writer pool for the catalog database.
///
/// Callers construct one of these and pass it (or its pool) into the
/// repositories explicitly; nothing in the crate assumes a process-wide
/// open database.
pub struct DatabaseConnection {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str) -> Result<Self> {
        // Create database file directory if it doesn't exist
        let db_path = if database_url.starts_with("sqlite://") {
            database_url.trim_start_matches("sqlite://")
        } else if database_url.starts_with("sqlite:") {
            database_url.trim_start_matches("sqlite:")
        } else {
            database_url
        };

        if let Some(parent) = Path::new(db_path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // WAL keeps the read-only pool responsive while a commit runs;
        // foreign_keys must be ON for the store_products cascade
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

        let pool = SqlitePoolOptions::new()
            .max_connections(DEFAULT_CONNECTION_POOL_SIZE)
            .connect_with(options)
            .await?;

        Ok(Self {
            pool,
            db_path: PathBuf::from(db_path),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Separate read-only pool for status and ad-hoc queries, never
    /// blocked by an in-flight writer transaction beyond SQLite's own
    /// isolation.
    pub async fn reader(&self) -> Result<SqlitePool> {
        let options = SqliteConnectOptions::new()
            .filename(&self.db_path)
            .read_only(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Ok(pool)
    }

    pub async fn migrate(&self) -> Result<()> {
        // Create tables manually for now
        let create_credentials_sql = r#"
            CREATE TABLE IF NOT EXISTS credentials (
                id TEXT PRIMARY KEY,
                api_key TEXT NOT NULL,
                app_id TEXT NOT NULL,
                extracted_at DATETIME NOT NULL,
                expires_at DATETIME,
                revoked BOOLEAN NOT NULL DEFAULT 0
            )
        "#;

        let create_stores_sql = r#"
            CREATE TABLE IF NOT EXISTS stores (
                store_number TEXT PRIMARY KEY,
                name TEXT,
                latitude REAL,
                longitude REAL,
                has_pickup BOOLEAN NOT NULL DEFAULT 0,
                has_delivery BOOLEAN NOT NULL DEFAULT 0,
                last_updated DATETIME
            )
        "#;

        let create_products_sql = r#"
            CREATE TABLE IF NOT EXISTS products (
                product_id TEXT PRIMARY KEY,
                name TEXT,
                brand TEXT,
                description TEXT,
                size TEXT,
                upc TEXT,
                category_path TEXT,
                filter_tags TEXT NOT NULL DEFAULT '[]',
                nutrition_tags TEXT NOT NULL DEFAULT '[]',
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
        "#;

        let create_store_products_sql = r#"
            CREATE TABLE IF NOT EXISTS store_products (
                product_id TEXT NOT NULL,
                store_number TEXT NOT NULL,
                price REAL,
                sale_price REAL,
                aisle TEXT,
                shelf TEXT,
                available BOOLEAN NOT NULL DEFAULT 1,
                last_updated DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (product_id, store_number),
                FOREIGN KEY (product_id) REFERENCES products (product_id) ON DELETE CASCADE,
                FOREIGN KEY (store_number) REFERENCES stores (store_number) ON DELETE CASCADE
            )
        "#;

        let create_servings_sql = r#"
            CREATE TABLE IF NOT EXISTS servings (
                product_id TEXT PRIMARY KEY,
                size REAL,
                size_uom TEXT,
                servings_per_container REAL,
                FOREIGN KEY (product_id) REFERENCES products (product_id) ON DELETE CASCADE
            )
        "#;

        let create_nutrition_facts_sql = r#"
            CREATE TABLE IF NOT EXISTS nutrition_facts (
                product_id TEXT NOT NULL,
                name TEXT NOT NULL,
                amount REAL,
                uom TEXT,
                category TEXT NOT NULL DEFAULT 'general',
                daily_value REAL,
                PRIMARY KEY (product_id, name),
                FOREIGN KEY (product_id) REFERENCES products (product_id) ON DELETE CASCADE
            )
        "#;

        let create_categories_sql = r#"
            CREATE TABLE IF NOT EXISTS categories (
                path TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                level INTEGER NOT NULL,
                product_count INTEGER NOT NULL DEFAULT 0
            )
        "#;

        let create_tags_sql = r#"
            CREATE TABLE IF NOT EXISTS tags (
                name TEXT NOT NULL,
                tag_type TEXT NOT NULL,
                product_count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (name, tag_type)
            )
        "#;

        let create_settings_sql = r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
        "#;

        let create_indexes_sql = r#"
            CREATE INDEX IF NOT EXISTS idx_store_products_store ON store_products (store_number);
            CREATE INDEX IF NOT EXISTS idx_store_products_updated ON store_products (last_updated);
            CREATE INDEX IF NOT EXISTS idx_products_category ON products (category_path);
            CREATE INDEX IF NOT EXISTS idx_credentials_extracted ON credentials (extracted_at);
        "#;

        sqlx::query(create_credentials_sql)
            .execute(&self.pool)
            .await?;
        sqlx::query(create_stores_sql).execute(&self.pool).await?;
        sqlx::query(create_products_sql).execute(&self.pool).await?;
        sqlx::query(create_store_products_sql)
            .execute(&self.pool)
            .await?;
        sqlx::query(create_servings_sql).execute(&self.pool).await?;
        sqlx::query(create_nutrition_facts_sql)
            .execute(&self.pool)
            .await?;
        sqlx::query(create_categories_sql)
            .execute(&self.pool)
            .await?;
        sqlx::query(create_tags_sql).execute(&self.pool).await?;
        sqlx::query(create_settings_sql).execute(&self.pool).await?;
        sqlx::query(create_indexes_sql).execute(&self.pool).await?;

        Ok(())
    }
}
