//! Wiring of data sources, pipeline and scheduler from configuration

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{AppConfig, DataSourceKind};
use crate::core::refresh::{RefreshPipeline, RefreshSettings};
use crate::core::scheduler::{RefreshSchedule, RefreshScheduler, ScheduleError};
use crate::db::PriceDatabase;
use crate::indicators::{IndicatorEngine, IndicatorSettings};
use crate::metrics::Metrics;
use crate::services::error::SourceError;
use crate::services::market_data::{FallbackProvider, MarketDataProvider};
use crate::services::symbols::{StaticSymbols, SymbolFormat, SymbolSource};
use crate::services::yahoo::{YahooFinanceClient, YahooFinanceProvider};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to build quote API client: {0}")]
    Client(#[from] SourceError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Resolved data sources
pub struct DataSources {
    pub provider: Arc<dyn MarketDataProvider>,
    pub symbols: Arc<dyn SymbolSource>,
    /// Present whenever the database is part of the chain
    pub database: Option<Arc<PriceDatabase>>,
}

fn yahoo_provider(config: &AppConfig) -> Result<Arc<YahooFinanceProvider>, SourceError> {
    let client = YahooFinanceClient::new(&config.yahoo_base_url, config.fetch_timeout)?;
    Ok(Arc::new(YahooFinanceProvider::new(client)))
}

/// Connect the configured sources.
///
/// A database that cannot be reached at start-up is not fatal: with a
/// fallback configured the quote API takes over, otherwise the handle
/// keeps trying to reconnect on each cycle.
pub async fn connect_sources(config: &AppConfig) -> Result<DataSources, BootstrapError> {
    let format = SymbolFormat::new(config.symbol_suffix.clone());
    let static_symbols: Arc<dyn SymbolSource> = Arc::new(StaticSymbols::new(config.symbols.clone()));

    if !config.data_source.uses_database() {
        info!(source = "yahoo", "Using quote API for market data");
        return Ok(DataSources {
            provider: yahoo_provider(config)?,
            symbols: static_symbols,
            database: None,
        });
    }

    let connected = PriceDatabase::connect(config.database.clone(), format.clone()).await;
    match (config.data_source, connected) {
        (DataSourceKind::DatabaseWithFallback, Ok(db)) => {
            let db = Arc::new(db);
            info!(source = "database_with_fallback", "Using database with quote API fallback");
            Ok(DataSources {
                provider: Arc::new(FallbackProvider::new(db.clone(), yahoo_provider(config)?)),
                symbols: db.clone(),
                database: Some(db),
            })
        }
        (DataSourceKind::DatabaseWithFallback, Err(e)) => {
            warn!(error = %e, "Database unreachable, degrading to quote API");
            Ok(DataSources {
                provider: yahoo_provider(config)?,
                symbols: static_symbols,
                database: None,
            })
        }
        (_, connected) => {
            let db = match connected {
                Ok(db) => db,
                Err(e) => {
                    warn!(error = %e, "Database unreachable at start-up, will retry each cycle");
                    PriceDatabase::new(config.database.clone(), format)
                }
            };
            let db = Arc::new(db);
            info!(source = "database", "Using database for market data");
            Ok(DataSources {
                provider: db.clone(),
                symbols: db.clone(),
                database: Some(db),
            })
        }
    }
}

pub fn refresh_settings(config: &AppConfig) -> RefreshSettings {
    RefreshSettings {
        interval: config.bar_interval,
        lookback_bars: config.lookback_bars,
        fetch_timeout: config.fetch_timeout,
        concurrency: config.fetch_concurrency,
        format: SymbolFormat::new(config.symbol_suffix.clone()),
        default_symbols: config.symbols.clone(),
    }
}

pub fn build_pipeline(
    config: &AppConfig,
    sources: &DataSources,
    metrics: Option<Arc<Metrics>>,
) -> RefreshPipeline {
    let pipeline = RefreshPipeline::new(
        sources.provider.clone(),
        sources.symbols.clone(),
        IndicatorEngine::new(IndicatorSettings::default()),
        refresh_settings(config),
    );
    match metrics {
        Some(m) => pipeline.with_metrics(m),
        None => pipeline,
    }
}

pub fn build_scheduler(
    config: &AppConfig,
    sources: &DataSources,
    metrics: Option<Arc<Metrics>>,
) -> Result<RefreshScheduler, BootstrapError> {
    let schedule = RefreshSchedule::from_config(&config.refresh)?;
    let pipeline = build_pipeline(config, sources, metrics.clone());
    Ok(RefreshScheduler::new(pipeline, schedule, metrics))
}
