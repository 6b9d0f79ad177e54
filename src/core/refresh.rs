//! One fetch-and-compute cycle over the tracked symbols

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::snapshot::{Published, Snapshot};
use crate::indicators::IndicatorEngine;
use crate::metrics::Metrics;
use crate::models::result::IndicatorResult;
use crate::services::error::SourceError;
use crate::services::market_data::{BarQuery, Interval, MarketDataProvider};
use crate::services::symbols::{SymbolFormat, SymbolSource};

/// Failure of a whole cycle; the previous snapshot stays published.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CycleError {
    #[error("no symbols available to refresh")]
    NoSymbols,
    #[error("data source unreachable for all {failed} symbols: {last_error}")]
    SourceUnreachable { failed: usize, last_error: String },
}

#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub interval: Interval,
    pub lookback_bars: usize,
    pub fetch_timeout: Duration,
    pub concurrency: usize,
    pub format: SymbolFormat,
    /// Used when the symbol source and the last known list are both empty
    pub default_symbols: Vec<String>,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval: Interval::Daily,
            lookback_bars: 120,
            fetch_timeout: Duration::from_secs(10),
            concurrency: 5,
            format: SymbolFormat::default(),
            default_symbols: Vec::new(),
        }
    }
}

pub struct RefreshPipeline {
    provider: Arc<dyn MarketDataProvider>,
    symbols: Arc<dyn SymbolSource>,
    engine: IndicatorEngine,
    settings: RefreshSettings,
    known_symbols: Published<Vec<String>>,
    metrics: Option<Arc<Metrics>>,
}

impl RefreshPipeline {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        symbols: Arc<dyn SymbolSource>,
        engine: IndicatorEngine,
        settings: RefreshSettings,
    ) -> Self {
        Self {
            provider,
            symbols,
            engine,
            settings,
            known_symbols: Published::new(Vec::new()),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn settings(&self) -> &RefreshSettings {
        &self.settings
    }

    pub fn format(&self) -> &SymbolFormat {
        &self.settings.format
    }

    fn qualify_all<I, S>(&self, raw: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        raw.into_iter()
            .filter(|s| !s.as_ref().trim().is_empty())
            .map(|s| self.settings.format.qualify(s.as_ref()))
            .filter(|s| seen.insert(s.to_uppercase()))
            .collect()
    }

    /// Current symbol list: the source, else the last known list, else defaults.
    pub async fn resolve_symbols(&self) -> Result<Vec<String>, CycleError> {
        match self.symbols.list_symbols().await {
            Ok(raw) => {
                let symbols = self.qualify_all(raw);
                if !symbols.is_empty() {
                    self.known_symbols.publish(symbols.clone());
                    return Ok(symbols);
                }
                warn!(source = self.symbols.name(), "Symbol source returned no symbols");
            }
            Err(e) => warn!(
                source = self.symbols.name(),
                error = %e,
                "Failed to list symbols"
            ),
        }

        let known = self.known_symbols.load();
        if !known.is_empty() {
            debug!(count = known.len(), "Using last known symbol list");
            return Ok(known.as_ref().clone());
        }

        let defaults = self.qualify_all(&self.settings.default_symbols);
        if defaults.is_empty() {
            return Err(CycleError::NoSymbols);
        }
        info!(count = defaults.len(), "Using default symbol list");
        self.known_symbols.publish(defaults.clone());
        Ok(defaults)
    }

    /// Fetch and evaluate one symbol; never fails, errors land in the row.
    pub async fn evaluate_symbol(
        &self,
        symbol: &str,
        previous_histogram: Option<f64>,
    ) -> IndicatorResult {
        let query = BarQuery::recent(symbol, self.settings.interval, self.settings.lookback_bars);
        let fetched = tokio::time::timeout(self.settings.fetch_timeout, self.provider.get_bars(&query))
            .await
            .unwrap_or(Err(SourceError::Timeout(self.settings.fetch_timeout)));

        let bars = match fetched {
            Ok(bars) => bars,
            Err(e) => {
                warn!(symbol, error = %e, "Failed to fetch bars");
                return IndicatorResult::failed(symbol, e);
            }
        };

        match self.engine.evaluate(&bars, previous_histogram) {
            Ok(values) => IndicatorResult::computed(symbol, values),
            Err(e) => {
                warn!(symbol, bars = bars.len(), error = %e, "Failed to compute indicators");
                IndicatorResult::failed(symbol, e)
            }
        }
    }

    /// Run one cycle against the previous snapshot's histograms.
    ///
    /// Rows keep symbol-list order.
    pub async fn run_cycle(&self, previous: &Snapshot) -> Result<Snapshot, CycleError> {
        let symbols = self.resolve_symbols().await?;
        let concurrency = self.settings.concurrency.max(1);

        let results: Vec<IndicatorResult> = stream::iter(symbols)
            .map(|symbol| {
                let previous_histogram = previous.histogram(&symbol);
                async move { self.evaluate_symbol(&symbol, previous_histogram).await }
            })
            .buffered(concurrency)
            .collect()
            .await;

        let failed = results.iter().filter(|r| !r.is_ok()).count();
        if let Some(metrics) = &self.metrics {
            metrics.symbol_errors_total.inc_by(failed as u64);
        }

        let all_unreachable = !results.is_empty()
            && results
                .iter()
                .all(|r| r.error().map(|e| e.is_connectivity()).unwrap_or(false));
        if all_unreachable {
            let last_error = results
                .last()
                .and_then(|r| r.error())
                .map(|e| e.to_string())
                .unwrap_or_default();
            return Err(CycleError::SourceUnreachable {
                failed: results.len(),
                last_error,
            });
        }

        info!(
            cycle = previous.cycle + 1,
            symbols = results.len(),
            failed,
            "Refresh cycle computed"
        );

        Ok(Snapshot {
            cycle: previous.cycle + 1,
            generated_at: Utc::now(),
            results,
        })
    }
}
