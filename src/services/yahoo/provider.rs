//! Yahoo Finance market data provider implementation

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveTime, Utc};
use tracing::debug;

use super::client::YahooFinanceClient;
use crate::models::indicators::Bar;
use crate::services::error::SourceError;
use crate::services::market_data::{
    apply_lookback, normalize_bars, BarQuery, Lookback, MarketDataProvider,
};

pub struct YahooFinanceProvider {
    client: YahooFinanceClient,
}

impl YahooFinanceProvider {
    pub fn new(client: YahooFinanceClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &YahooFinanceClient {
        &self.client
    }

    /// Unix second bounds for the chart request
    fn period_bounds(query: &BarQuery) -> (i64, i64) {
        match query.lookback {
            Lookback::Bars(n) => {
                let end = Utc::now();
                let start = end - ChronoDuration::days(query.interval.calendar_days_for(n));
                (start.timestamp(), end.timestamp())
            }
            Lookback::Range { start, end } => {
                let start = start.and_time(NaiveTime::MIN).and_utc().timestamp();
                // period2 is exclusive
                let end = (end + ChronoDuration::days(1))
                    .and_time(NaiveTime::MIN)
                    .and_utc()
                    .timestamp();
                (start, end)
            }
        }
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    async fn get_bars(&self, query: &BarQuery) -> Result<Vec<Bar>, SourceError> {
        let (period1, period2) = Self::period_bounds(query);
        let chart = self
            .client
            .fetch_chart(&query.symbol, query.interval, period1, period2)
            .await?;

        let raw = chart.to_bars();
        let skipped = chart.timestamp.len().saturating_sub(raw.len());
        if skipped > 0 {
            debug!(symbol = %query.symbol, skipped, "Skipped incomplete chart rows");
        }

        let bars = apply_lookback(normalize_bars(raw), &query.lookback);
        if bars.is_empty() {
            return Err(SourceError::NotFound(query.symbol.clone()));
        }
        Ok(bars)
    }

    fn name(&self) -> &'static str {
        "yahoo"
    }
}
