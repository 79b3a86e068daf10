//! Configuration infrastructure
//!
//! Contains configuration loading and management for the catalog engine.
//!
//! Configuration is organized into three tiers:
//! 1. User-configurable settings
//! 2. Hidden/Advanced settings (in config file only)
//! 3. Application-managed settings (auto-updated by the engine)

#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

use crate::domain::constants::{api, database, refresh, validation};

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// User-configurable settings
    #[serde(default)]
    pub user: UserConfig,

    /// Hidden/Advanced settings (config file only)
    #[serde(default)]
    pub advanced: AdvancedConfig,

    /// Application-managed settings (auto-updated)
    #[serde(default)]
    pub app_managed: AppManagedConfig,
}

/// User-configurable settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    /// Maximum concurrent store refresh workers
    pub max_workers: u32,

    /// Records requested per search page
    pub hits_per_page: u32,

    /// Enable verbose logging
    pub verbose_logging: bool,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Use structured JSON output for the log file
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Module-specific log level filters (e.g., "sqlx": "warn")
    pub module_filters: HashMap<String, String>,
}

/// Hidden/Advanced settings that are in the config file but rarely touched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Search API endpoint
    pub search_endpoint: String,

    /// Store directory endpoint
    pub store_directory_endpoint: String,

    /// Query text sent with every search page request
    pub search_query: String,

    /// Timeout for search page requests in milliseconds
    pub request_timeout_ms: u64,

    /// Combined request rate against the search API
    pub max_requests_per_second: u32,

    /// Hard cap on pages fetched per store
    pub max_pages_per_store: u32,

    /// Credential extraction timeout in seconds
    pub extraction_timeout_secs: u64,

    /// Database filename under the app data directory
    pub database_filename: String,
}

/// Application-managed settings that are automatically updated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppManagedConfig {
    /// RFC 3339 timestamp of the last engine-level refresh
    pub last_refresh: Option<String>,

    /// Products committed by the last refresh run
    pub last_refresh_product_count: Option<u32>,

    /// Configuration version for migration purposes
    pub config_version: u32,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            max_workers: refresh::DEFAULT_MAX_WORKERS,
            hits_per_page: api::HITS_PER_PAGE,
            verbose_logging: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("sqlx".to_string(), "warn".to_string());
                filters.insert("reqwest".to_string(), "info".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("shelfsync".to_string(), "info".to_string());
                filters
            },
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            search_endpoint: api::SEARCH_ENDPOINT.to_string(),
            store_directory_endpoint: api::STORE_DIRECTORY_ENDPOINT.to_string(),
            search_query: String::new(),
            request_timeout_ms: refresh::DEFAULT_REQUEST_TIMEOUT_MS,
            max_requests_per_second: refresh::DEFAULT_REQUESTS_PER_SECOND,
            max_pages_per_store: api::MAX_PAGES_PER_STORE,
            extraction_timeout_secs: refresh::EXTRACTION_TIMEOUT_SECS,
            database_filename: database::DEFAULT_DB_FILENAME.to_string(),
        }
    }
}

impl Default for AppManagedConfig {
    fn default() -> Self {
        Self {
            last_refresh: None,
            last_refresh_product_count: None,
            config_version: 1,
        }
    }
}

impl AppConfig {
    /// Reject configurations outside the supported bounds
    pub fn validate(&self) -> Result<()> {
        let workers = self.user.max_workers;
        if !(validation::MIN_WORKERS..=validation::MAX_WORKERS).contains(&workers) {
            anyhow::bail!(
                "max_workers {} outside supported range {}..={}",
                workers,
                validation::MIN_WORKERS,
                validation::MAX_WORKERS
            );
        }

        let hits = self.user.hits_per_page;
        if !(validation::MIN_HITS_PER_PAGE..=validation::MAX_HITS_PER_PAGE).contains(&hits) {
            anyhow::bail!(
                "hits_per_page {} outside supported range {}..={}",
                hits,
                validation::MIN_HITS_PER_PAGE,
                validation::MAX_HITS_PER_PAGE
            );
        }

        let timeout = self.advanced.request_timeout_ms;
        if !(validation::MIN_REQUEST_TIMEOUT_MS..=validation::MAX_REQUEST_TIMEOUT_MS)
            .contains(&timeout)
        {
            anyhow::bail!(
                "request_timeout_ms {} outside supported range {}..={}",
                timeout,
                validation::MIN_REQUEST_TIMEOUT_MS,
                validation::MAX_REQUEST_TIMEOUT_MS
            );
        }

        Ok(())
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join("shelfsync");

        Ok(config_dir)
    }

    /// Get application data directory
    pub fn get_app_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to get user data directory")?
            .join("shelfsync");

        Ok(data_dir)
    }

    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;
        let config_path = config_dir.join("shelfsync_config.json");

        Ok(Self { config_path })
    }

    /// Initialize configuration system on first run
    pub async fn initialize_on_first_run(&self) -> Result<AppConfig> {
        let config_dir = self
            .config_path
            .parent()
            .context("Failed to get config directory")?;

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)
                .await
                .context("Failed to create config directory")?;
            info!("✅ Created configuration directory: {:?}", config_dir);
        }

        let is_first_run = !self.config_path.exists();

        if is_first_run {
            info!("🎉 First run detected - initializing default configuration");
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            self.create_data_directories().await?;
            info!("✅ Initial configuration setup completed");
            Ok(default_config)
        } else {
            self.load_config().await
        }
    }

    async fn create_data_directories(&self) -> Result<()> {
        let app_data_dir = Self::get_app_data_dir()?;

        let directories = [app_data_dir.join("database"), app_data_dir.join("logs")];
        for dir in &directories {
            if !dir.exists() {
                fs::create_dir_all(dir)
                    .await
                    .with_context(|| format!("Failed to create directory: {:?}", dir))?;
                info!("📁 Created directory: {:?}", dir);
            }
        }

        Ok(())
    }

    /// Database URL derived from the data directory and configured filename
    pub fn database_url(config: &AppConfig) -> Result<String> {
        let path = Self::get_app_data_dir()?
            .join("database")
            .join(&config.advanced.database_filename);
        Ok(format!("sqlite:{}", path.display()))
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!(
                "Configuration file not found, creating default: {:?}",
                self.config_path
            );
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .context("Failed to read configuration file")?;

        match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => {
                info!("Loaded configuration from: {:?}", self.config_path);
                Ok(config)
            }
            Err(parse_error) => {
                tracing::warn!("⚠️ Configuration file unreadable: {}", parse_error);
                tracing::warn!("⚠️ Resetting to default configuration");

                let backup_path = self.config_path.with_extension("json.corrupted");
                if let Err(e) = fs::copy(&self.config_path, &backup_path).await {
                    tracing::warn!("Failed to back up corrupted config: {}", e);
                } else {
                    info!("Backed up corrupted config to: {:?}", backup_path);
                }

                let default_config = AppConfig::default();
                self.save_config(&default_config)
                    .await
                    .context("Failed to save default configuration")?;
                Ok(default_config)
            }
        }
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create config directory")?;
            }
        }

        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;
        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        Ok(())
    }
}
