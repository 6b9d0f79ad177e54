//! Market data provider interface shared by the database and quote API adapters.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::indicators::Bar;
use crate::services::error::SourceError;

/// Bar granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Daily,
    Weekly,
}

impl Interval {
    /// Wire name used by the quote API
    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Daily => "1d",
            Interval::Weekly => "1wk",
        }
    }

    /// Calendar days that comfortably cover `bars` trading bars
    pub fn calendar_days_for(self, bars: usize) -> i64 {
        let bars = bars as i64;
        match self {
            // five trading days a week plus holidays
            Interval::Daily => bars * 3 / 2 + 10,
            Interval::Weekly => bars * 7 + 7,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1d" | "daily" | "day" => Ok(Interval::Daily),
            "1wk" | "weekly" | "week" => Ok(Interval::Weekly),
            other => Err(format!("unsupported interval '{}'", other)),
        }
    }
}

/// How much history to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookback {
    /// The most recent N bars
    Bars(usize),
    /// Inclusive date range
    Range { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarQuery {
    /// Qualified symbol, e.g. `RELIANCE.NS`
    pub symbol: String,
    pub interval: Interval,
    pub lookback: Lookback,
}

impl BarQuery {
    pub fn recent(symbol: impl Into<String>, interval: Interval, bars: usize) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            lookback: Lookback::Bars(bars),
        }
    }

    pub fn between(
        symbol: impl Into<String>,
        interval: Interval,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            lookback: Lookback::Range { start, end },
        }
    }
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Bars for the query, ascending by date with no duplicate dates
    async fn get_bars(&self, query: &BarQuery) -> Result<Vec<Bar>, SourceError>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Sort ascending by date; on duplicate dates the later row wins.
pub fn normalize_bars(mut bars: Vec<Bar>) -> Vec<Bar> {
    bars.sort_by_key(|b| b.date);
    let mut out: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match out.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => out.push(bar),
        }
    }
    out
}

/// Trim normalized bars to the requested window
pub fn apply_lookback(bars: Vec<Bar>, lookback: &Lookback) -> Vec<Bar> {
    match *lookback {
        Lookback::Bars(n) => {
            let skip = bars.len().saturating_sub(n);
            bars.into_iter().skip(skip).collect()
        }
        Lookback::Range { start, end } => bars
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect(),
    }
}

/// Database first, quote API when the database errors or has no rows.
pub struct FallbackProvider {
    primary: Arc<dyn MarketDataProvider>,
    fallback: Arc<dyn MarketDataProvider>,
}

impl FallbackProvider {
    pub fn new(primary: Arc<dyn MarketDataProvider>, fallback: Arc<dyn MarketDataProvider>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl MarketDataProvider for FallbackProvider {
    async fn get_bars(&self, query: &BarQuery) -> Result<Vec<Bar>, SourceError> {
        match self.primary.get_bars(query).await {
            Ok(bars) if !bars.is_empty() => return Ok(bars),
            Ok(_) => debug!(
                symbol = %query.symbol,
                primary = self.primary.name(),
                "No rows from primary source, using fallback"
            ),
            Err(e) => warn!(
                symbol = %query.symbol,
                primary = self.primary.name(),
                error = %e,
                "Primary source failed, using fallback"
            ),
        }
        self.fallback.get_bars(query).await
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}
