//! Per-symbol output of a refresh cycle

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::indicators::IndicatorError;
use crate::models::indicators::{MacdCrossover, RsiSignal};
use crate::services::SourceError;

/// Numeric indicator values for one symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorValues {
    pub price: f64,
    pub rsi: f64,
    pub rsi_signal: RsiSignal,
    pub macd: f64,
    pub macd_signal_line: f64,
    pub macd_histogram: f64,
    pub macd_crossover: MacdCrossover,
    pub volume: u64,
}

/// Why a symbol has no values this cycle
#[derive(Debug, Clone, Error)]
pub enum SymbolError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Indicator(#[from] IndicatorError),
}

impl SymbolError {
    pub fn kind(&self) -> &'static str {
        match self {
            SymbolError::Source(e) => e.kind(),
            SymbolError::Indicator(e) => e.kind(),
        }
    }

    /// Failure that points at the data source being down rather than at the symbol.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, SymbolError::Source(e) if e.is_connectivity())
    }
}

impl Serialize for SymbolError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SymbolError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// One row of the snapshot.
///
/// A row carries either computed values or an error, never both; the
/// constructors are the only way to build one.
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorResult {
    symbol: String,
    updated_at: DateTime<Utc>,
    #[serde(flatten)]
    values: Option<IndicatorValues>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<SymbolError>,
}

impl IndicatorResult {
    pub fn computed(symbol: impl Into<String>, values: IndicatorValues) -> Self {
        Self {
            symbol: symbol.into(),
            updated_at: Utc::now(),
            values: Some(values),
            error: None,
        }
    }

    pub fn failed(symbol: impl Into<String>, error: impl Into<SymbolError>) -> Self {
        Self {
            symbol: symbol.into(),
            updated_at: Utc::now(),
            values: None,
            error: Some(error.into()),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn values(&self) -> Option<&IndicatorValues> {
        self.values.as_ref()
    }

    pub fn error(&self) -> Option<&SymbolError> {
        self.error.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.values.is_some()
    }
}
