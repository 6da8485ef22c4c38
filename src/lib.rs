// plannercal library
// Day-indexed calendar views over stored events, homework and pluggable
// providers, plus the background importer for external ICS feeds.

pub mod calendar;
pub mod config;
pub mod database;
pub mod error;
pub mod http_config;
pub mod models;
pub mod sync;
pub mod utils;

// Re-export commonly used types
pub use calendar::{DataKinds, Provider, ProviderData, ProviderRegistry, ViewBuilder, ViewWindow};
pub use config::AppConfig;
pub use database::Database;
pub use error::{AppError, AppResult, ParseError};
pub use models::*;
pub use sync::CalendarSyncer;

use anyhow::Context;
use calendar::HttpFeedFetcher;
use http_config::HttpConfig;
use std::sync::Arc;

/// Application state shared across the application
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub registry: Arc<ProviderRegistry>,
    pub syncer: Arc<CalendarSyncer>,
    pub config: AppConfig,
    pub shutdown: tokio_util::sync::CancellationToken,
}

impl AppState {
    /// Opens the database, loads the provider registry and builds the feed
    /// syncer.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        config::validate_config(&config)?;

        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
            }
        }

        let db = Arc::new(Database::open(&config.db_url()).await?);
        let registry = Arc::new(
            ProviderRegistry::load(&db, &config)
                .await
                .context("Failed to load calendar providers")?,
        );
        let fetcher = Arc::new(HttpFeedFetcher::new(&HttpConfig::ics_fetch())?);
        let syncer = Arc::new(CalendarSyncer::new(db.clone(), fetcher));

        Ok(Self {
            db,
            registry,
            syncer,
            config,
            shutdown: tokio_util::sync::CancellationToken::new(),
        })
    }

    pub fn view_builder(&self) -> ViewBuilder {
        ViewBuilder::new(self.db.clone(), self.registry.clone(), self.config.provider_timeout)
    }
}
