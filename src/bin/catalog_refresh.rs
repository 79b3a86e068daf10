//! One-shot catalog refresh across the store directory
//!
//! Syncs the store directory, then refreshes every store whose replica
//! is empty or stale. Pass store numbers as arguments to refresh only
//! those stores. Ctrl-C stops admitting new stores while in-flight
//! stores run to completion. The search credential comes from the
//! `SHELFSYNC_API_KEY` / `SHELFSYNC_APP_ID` environment variables.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use shelfsync::application::SyncEngine;
use shelfsync::domain::events::ProgressReporter;
use shelfsync::domain::services::{CredentialExtractor, ExtractedCredential};
use shelfsync::infrastructure::config::ConfigManager;
use shelfsync::infrastructure::database_connection::DatabaseConnection;

/// Reads the key pair from the environment. Refresh runs headless in
/// cron, so there is no interactive session to recover a credential
/// from.
struct EnvCredentialExtractor;

#[async_trait]
impl CredentialExtractor for EnvCredentialExtractor {
    async fn extract(&self) -> anyhow::Result<ExtractedCredential> {
        let api_key =
            std::env::var("SHELFSYNC_API_KEY").context("SHELFSYNC_API_KEY is not set")?;
        let app_id = std::env::var("SHELFSYNC_APP_ID").context("SHELFSYNC_APP_ID is not set")?;
        Ok(ExtractedCredential {
            api_key,
            app_id,
            expires_at: None,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = shelfsync::infrastructure::logging::init_logging();

    info!("🚀 Catalog refresh runner starting");

    let config_manager = ConfigManager::new()?;
    let config = config_manager.initialize_on_first_run().await?;
    let database_url = ConfigManager::database_url(&config)?;
    info!("🗄️ Using database: {}", database_url);

    let db = DatabaseConnection::new(&database_url).await?;
    db.migrate().await?;

    let token = CancellationToken::new();
    let engine = SyncEngine::new(config, &db, Arc::new(EnvCredentialExtractor))?
        .with_cancellation(token.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Ctrl-C received, letting in-flight stores finish");
            token.cancel();
        }
    });

    match engine.sync_store_directory().await {
        Ok(count) => info!("🏬 Store directory synced, {} stores on record", count),
        Err(e) => warn!("⚠️ Store directory sync failed, using saved stores: {}", e),
    }

    let requested: Vec<String> = std::env::args().skip(1).collect();
    let stores = if requested.is_empty() {
        engine
            .repository()
            .list_stores()
            .await?
            .into_iter()
            .map(|store| store.store_number)
            .collect()
    } else {
        requested
    };
    if stores.is_empty() {
        warn!("⚠️ No stores known locally and none requested, nothing to do");
        return Ok(());
    }

    let (reporter, mut progress) = ProgressReporter::channel();
    let progress_printer = tokio::spawn(async move {
        while let Some(update) = progress.recv().await {
            info!("🔄 [{}] {}", update.phase, update.message);
        }
    });

    let summary = engine.refresh_if_stale(&stores, &reporter).await?;
    drop(reporter);
    let _ = progress_printer.await;

    for result in summary.results.values().filter(|result| !result.success) {
        let reason = result
            .error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "unknown".to_string());
        warn!("❌ Store {}: {}", result.store_number, reason);
    }

    info!(
        "✅ Refresh run complete: {} of {} stores succeeded, {} products committed",
        summary.succeeded, summary.total_stores, summary.products_added
    );

    if summary.all_succeeded() {
        Ok(())
    } else {
        anyhow::bail!(
            "{} of {} stores failed to refresh",
            summary.failed,
            summary.total_stores
        )
    }
}
