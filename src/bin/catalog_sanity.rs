//! Catalog sanity runner for inspecting the local replica state
//!
//! Opens the configured database read-only and prints per-store catalog
//! status plus the top-level ontology, without touching the network.
//! Pass store numbers as arguments to limit the report, e.g.
//! `catalog_sanity 320 451`.

use tracing::{info, warn};

use shelfsync::domain::constants::settings;
use shelfsync::infrastructure::catalog_repository::CatalogRepository;
use shelfsync::infrastructure::config::ConfigManager;
use shelfsync::infrastructure::database_connection::DatabaseConnection;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = shelfsync::infrastructure::logging::init_logging();

    info!("🚀 Catalog sanity runner starting");

    let config_manager = ConfigManager::new()?;
    let config = config_manager.initialize_on_first_run().await?;
    let database_url = ConfigManager::database_url(&config)?;
    info!("🗄️ Using database: {}", database_url);

    let db = DatabaseConnection::new(&database_url).await?;
    db.migrate().await?;

    let reader = db.reader().await?;
    let repository = CatalogRepository::new(reader);

    let requested: Vec<String> = std::env::args().skip(1).collect();
    let stores = if requested.is_empty() {
        repository.list_stores().await?
    } else {
        let mut stores = Vec::new();
        for store_number in &requested {
            match repository.get_store(store_number).await? {
                Some(store) => stores.push(store),
                None => warn!("⚠️ Store {} is not in the local directory", store_number),
            }
        }
        stores
    };

    if stores.is_empty() {
        warn!("⚠️ No stores known locally; run a store directory sync first");
    }

    for store in &stores {
        let status = repository.catalog_status(&store.store_number).await?;
        let last = store
            .last_updated
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        info!(
            "🏬 Store {} ({}): {} products, empty={}, stale={}, last refreshed {}",
            store.store_number,
            store.name.as_deref().unwrap_or("unnamed"),
            status.product_count,
            status.is_empty,
            status.is_stale,
            last
        );
    }

    if let Some(active) = repository.get_setting(settings::ACTIVE_STORE).await? {
        info!("⭐ Active store: {}", active);
    }
    if let Some(last_refresh) = repository.get_setting(settings::LAST_REFRESH).await? {
        info!("🕒 Last refresh run: {}", last_refresh);
    }

    let categories = repository.top_categories(10).await?;
    if categories.is_empty() {
        info!("No ontology data yet");
    } else {
        info!("📊 Top categories by product count:");
        for category in categories {
            info!(
                "  {:>4}  {} (level {})",
                category.product_count, category.path, category.level
            );
        }
    }

    info!("✅ Catalog sanity run complete");
    Ok(())
}
