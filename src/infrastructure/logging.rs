//! Logging system configuration and initialization
//!
//! This module provides the logging setup for the catalog engine:
//! - Console and file output support
//! - Configuration file based log level control
//! - Structured JSON logging for the file layer (optional)
//! - Module-level filters to keep dependency noise down

#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use lazy_static::lazy_static;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::infrastructure::config::ConfigManager;

// Re-export LoggingConfig from config module
pub use crate::infrastructure::config::LoggingConfig;

const LOG_FILE_NAME: &str = "shelfsync.log";

// Global guard to keep the log file writer alive
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> =
        Mutex::new(Vec::new());
}

fn timestamp_format() -> ChronoUtc {
    ChronoUtc::new("%Y-%m-%d %H:%M:%S%.3f".to_string())
}

/// Get the log directory under the application data directory
pub fn get_log_directory() -> PathBuf {
    ConfigManager::get_app_data_dir()
        .map(|dir| dir.join("logs"))
        .unwrap_or_else(|_| {
            std::env::current_dir()
                .unwrap_or_default()
                .join("logs")
        })
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    let config = LoggingConfig::default();
    init_logging_with_config(config)
}

/// Initialize logging with custom configuration
///
/// `RUST_LOG` overrides everything in the config when set. Without it,
/// the filter is built from `config.level` plus the per-module filters,
/// with sqlx/hyper query noise suppressed unless TRACE is requested.
pub fn init_logging_with_config(config: LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = EnvFilter::new(&config.level);

        if !config.level.to_lowercase().contains("trace") {
            filter = filter
                .add_directive("sqlx::query=warn".parse().unwrap())
                .add_directive("hyper=warn".parse().unwrap())
                .add_directive("h2=warn".parse().unwrap());
        }

        for (module, level) in &config.module_filters {
            if let Ok(directive) = format!("{}={}", module, level).parse() {
                filter = filter.add_directive(directive);
            }
        }

        filter
    });

    let registry = Registry::default().with(env_filter);

    match (config.file_output, config.console_output) {
        (true, true) => {
            let log_dir = get_log_directory();
            std::fs::create_dir_all(&log_dir)
                .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;

            let file_appender = rolling::never(&log_dir, LOG_FILE_NAME);
            let (file_writer, file_guard) = non_blocking(file_appender);
            LOG_GUARDS.lock().unwrap().push(file_guard);

            if config.json_format {
                let file_layer = fmt::Layer::new()
                    .json()
                    .with_writer(file_writer)
                    .with_timer(timestamp_format())
                    .with_target(true)
                    .with_ansi(false);
                let console_layer = fmt::Layer::new()
                    .with_writer(std::io::stdout)
                    .with_timer(timestamp_format())
                    .with_target(false);
                registry.with(file_layer).with(console_layer).init();
            } else {
                let file_layer = fmt::Layer::new()
                    .with_writer(file_writer)
                    .with_timer(timestamp_format())
                    .with_target(false)
                    .with_ansi(false);
                let console_layer = fmt::Layer::new()
                    .with_writer(std::io::stdout)
                    .with_timer(timestamp_format())
                    .with_target(false);
                registry.with(file_layer).with(console_layer).init();
            }
        }
        (true, false) => {
            let log_dir = get_log_directory();
            std::fs::create_dir_all(&log_dir)
                .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;

            let file_appender = rolling::never(&log_dir, LOG_FILE_NAME);
            let (file_writer, file_guard) = non_blocking(file_appender);
            LOG_GUARDS.lock().unwrap().push(file_guard);

            if config.json_format {
                let file_layer = fmt::Layer::new()
                    .json()
                    .with_writer(file_writer)
                    .with_timer(timestamp_format())
                    .with_target(true)
                    .with_ansi(false);
                registry.with(file_layer).init();
            } else {
                let file_layer = fmt::Layer::new()
                    .with_writer(file_writer)
                    .with_timer(timestamp_format())
                    .with_target(false)
                    .with_ansi(false);
                registry.with(file_layer).init();
            }
        }
        (false, true) => {
            let console_layer = fmt::Layer::new()
                .with_writer(std::io::stdout)
                .with_timer(timestamp_format())
                .with_target(false);
            registry.with(console_layer).init();
        }
        (false, false) => {
            return Err(anyhow!("No logging output configured"));
        }
    }

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    info!("Console output: {}", config.console_output);
    info!("File output: {}", config.file_output);
    if config.file_output {
        info!("Log directory: {:?}", get_log_directory());
    }

    Ok(())
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("=== ShelfSync System Information ===");
    info!("Application version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    info!("Architecture: {}", std::env::consts::ARCH);

    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {:?}", current_dir);
    }

    info!("====================================");
}
