use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One daily OHLCV record for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Closing prices of an ascending bar sequence
pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsiIndicator {
    pub value: f64,
    pub period: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacdIndicator {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
    /// Histogram one bar earlier.
    pub previous_histogram: f64,
    pub period: (u32, u32, u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmaIndicator {
    pub value: f64,
    pub period: u32,
}

/// RSI band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiSignal {
    Overbought,
    Oversold,
    Neutral,
}

impl RsiSignal {
    pub fn label(self) -> &'static str {
        match self {
            RsiSignal::Overbought => "Overbought",
            RsiSignal::Oversold => "Oversold",
            RsiSignal::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for RsiSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RsiSignal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "overbought" => Ok(RsiSignal::Overbought),
            "oversold" => Ok(RsiSignal::Oversold),
            "neutral" => Ok(RsiSignal::Neutral),
            other => Err(format!("unknown RSI band '{}'", other)),
        }
    }
}

/// MACD histogram crossover class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MacdCrossover {
    /// Histogram moved from <= 0 to > 0
    Bullish,
    /// Histogram moved from >= 0 to < 0
    Bearish,
    Above,
    Below,
    None,
}

impl MacdCrossover {
    pub fn label(self) -> &'static str {
        match self {
            MacdCrossover::Bullish => "↑ Bullish",
            MacdCrossover::Bearish => "↓ Bearish",
            MacdCrossover::Above => "↑ Above",
            MacdCrossover::Below => "↓ Below",
            MacdCrossover::None => "-",
        }
    }
}

impl fmt::Display for MacdCrossover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MacdCrossover {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bullish" => Ok(MacdCrossover::Bullish),
            "bearish" => Ok(MacdCrossover::Bearish),
            "above" => Ok(MacdCrossover::Above),
            "below" => Ok(MacdCrossover::Below),
            "none" => Ok(MacdCrossover::None),
            other => Err(format!("unknown crossover class '{}'", other)),
        }
    }
}
