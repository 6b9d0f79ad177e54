//! MACD (Moving Average Convergence Divergence) indicator

use crate::indicators::error::{ensure_finite, IndicatorError};
use crate::indicators::trend::calculate_ema_series;
use crate::models::indicators::{MacdCrossover, MacdIndicator};

/// Minimum closes for a MACD with a previous-bar histogram
pub fn macd_min_closes(slow_period: u32, signal_period: u32) -> usize {
    slow_period as usize + signal_period as usize
}

/// Calculate MACD indicator
///
/// MACD = EMA(fast) - EMA(slow)
/// Signal = EMA(signal) of MACD
/// Histogram = MACD - Signal
pub fn calculate_macd(
    closes: &[f64],
    fast_period: u32,
    slow_period: u32,
    signal_period: u32,
) -> Result<MacdIndicator, IndicatorError> {
    if fast_period == 0 || slow_period == 0 || signal_period == 0 || fast_period >= slow_period {
        return Err(IndicatorError::InvalidPeriod { indicator: "MACD" });
    }
    let required = macd_min_closes(slow_period, signal_period);
    if closes.len() < required {
        return Err(IndicatorError::InsufficientData {
            indicator: "MACD",
            required,
            available: closes.len(),
        });
    }
    ensure_finite(closes)?;

    let fast = fast_period as usize;
    let slow = slow_period as usize;
    let insufficient = || IndicatorError::InsufficientData {
        indicator: "MACD",
        required,
        available: closes.len(),
    };

    let fast_series = calculate_ema_series(closes, fast_period)?;
    let slow_series = calculate_ema_series(closes, slow_period)?;

    // Both series end at the last close; align the fast one to the slow start.
    let offset = slow - fast;
    let macd_values: Vec<f64> = slow_series
        .iter()
        .zip(&fast_series[offset..])
        .map(|(slow_ema, fast_ema)| fast_ema - slow_ema)
        .collect();

    let signal_series = calculate_ema_series(&macd_values, signal_period)?;
    if signal_series.len() < 2 {
        return Err(insufficient());
    }

    let histogram_at = |back: usize| {
        let macd = macd_values[macd_values.len() - 1 - back];
        let signal = signal_series[signal_series.len() - 1 - back];
        (macd, signal, macd - signal)
    };

    let (macd, signal, histogram) = histogram_at(0);
    let (_, _, previous_histogram) = histogram_at(1);

    Ok(MacdIndicator {
        macd,
        signal,
        histogram,
        previous_histogram,
        period: (fast_period, slow_period, signal_period),
    })
}

/// Calculate MACD with default periods (12, 26, 9)
pub fn calculate_macd_default(closes: &[f64]) -> Result<MacdIndicator, IndicatorError> {
    calculate_macd(closes, 12, 26, 9)
}

/// Classify the histogram move from `previous` to `current`.
///
/// Without a previous value the current sign alone decides.
pub fn classify_crossover(previous: Option<f64>, current: f64) -> MacdCrossover {
    if let Some(prev) = previous {
        if prev <= 0.0 && current > 0.0 {
            return MacdCrossover::Bullish;
        }
        if prev >= 0.0 && current < 0.0 {
            return MacdCrossover::Bearish;
        }
    }

    if current > 0.0 {
        MacdCrossover::Above
    } else if current < 0.0 {
        MacdCrossover::Below
    } else {
        MacdCrossover::None
    }
}
