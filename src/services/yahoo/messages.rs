//! Chart endpoint payloads

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Deserialize;

use crate::models::indicators::Bar;

#[derive(Debug, Clone, Deserialize)]
pub struct ChartResponse {
    pub chart: ChartEnvelope,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartEnvelope {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ChartError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartError {
    pub code: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartResult {
    pub meta: ChartMeta,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: ChartIndicators,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub symbol: String,
    #[serde(default)]
    pub currency: Option<String>,
    /// Exchange offset from UTC in seconds
    #[serde(default)]
    pub gmtoffset: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartIndicators {
    #[serde(default)]
    pub quote: Vec<Quote>,
}

/// Column-oriented OHLCV; any entry may be null on halted days
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Quote {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

impl ChartResult {
    /// Rows with a timestamp and all four prices; anything else is skipped.
    /// Missing volume counts as zero.
    pub fn to_bars(&self) -> Vec<Bar> {
        let Some(quote) = self.indicators.quote.first() else {
            return Vec::new();
        };
        let offset = FixedOffset::east_opt(self.meta.gmtoffset);

        self.timestamp
            .iter()
            .enumerate()
            .filter_map(|(i, &ts)| {
                let date = exchange_date(ts, offset)?;
                let open = column(&quote.open, i)?;
                let high = column(&quote.high, i)?;
                let low = column(&quote.low, i)?;
                let close = column(&quote.close, i)?;
                let volume = column(&quote.volume, i).unwrap_or(0.0).max(0.0) as u64;
                Some(Bar::new(date, open, high, low, close, volume))
            })
            .collect()
    }
}

fn column(values: &[Option<f64>], index: usize) -> Option<f64> {
    values.get(index).copied().flatten().filter(|v| v.is_finite())
}

/// Trading date in the exchange's local time
fn exchange_date(timestamp: i64, offset: Option<FixedOffset>) -> Option<NaiveDate> {
    let utc = DateTime::from_timestamp(timestamp, 0)?;
    Some(match offset {
        Some(offset) => utc.with_timezone(&offset).date_naive(),
        None => utc.date_naive(),
    })
}
