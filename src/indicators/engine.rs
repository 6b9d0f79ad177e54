//! Indicator engine: closes in, classified RSI/MACD values out

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::indicators::error::IndicatorError;
use crate::indicators::momentum::{
    calculate_macd, calculate_rsi, classify_crossover, classify_rsi, macd_min_closes,
};
use crate::models::indicators::{closes, Bar};
use crate::models::result::IndicatorValues;

/// Periods and thresholds used by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSettings {
    pub rsi_period: u32,
    pub macd_fast: u32,
    pub macd_slow: u32,
    pub macd_signal: u32,
    pub overbought: f64,
    pub oversold: f64,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            overbought: 70.0,
            oversold: 30.0,
        }
    }
}

impl IndicatorSettings {
    /// Fewest bars that yield both indicators
    pub fn min_bars(&self) -> usize {
        (self.rsi_period as usize + 1).max(macd_min_closes(self.macd_slow, self.macd_signal))
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndicatorEngine {
    settings: IndicatorSettings,
}

impl IndicatorEngine {
    pub fn new(settings: IndicatorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &IndicatorSettings {
        &self.settings
    }

    /// Compute every value for the latest bar.
    ///
    /// `previous_histogram` is the symbol's histogram from the prior
    /// snapshot; when absent the histogram one bar earlier is used instead.
    pub fn evaluate(
        &self,
        bars: &[Bar],
        previous_histogram: Option<f64>,
    ) -> Result<IndicatorValues, IndicatorError> {
        let s = &self.settings;
        let closes = closes(bars);

        let rsi = calculate_rsi(&closes, s.rsi_period)?;
        let macd = calculate_macd(&closes, s.macd_fast, s.macd_slow, s.macd_signal)?;

        // calculate_rsi already rejected an empty series
        let last = bars.last().ok_or(IndicatorError::InsufficientData {
            indicator: "RSI",
            required: self.settings.min_bars(),
            available: 0,
        })?;

        let reference = previous_histogram.unwrap_or(macd.previous_histogram);
        let crossover = classify_crossover(Some(reference), macd.histogram);
        trace!(
            rsi = rsi.value,
            histogram = macd.histogram,
            reference,
            ?crossover,
            "Evaluated indicators"
        );

        Ok(IndicatorValues {
            price: last.close,
            rsi: rsi.value,
            rsi_signal: classify_rsi(rsi.value, s.overbought, s.oversold),
            macd: macd.macd,
            macd_signal_line: macd.signal,
            macd_histogram: macd.histogram,
            macd_crossover: crossover,
            volume: last.volume,
        })
    }
}
