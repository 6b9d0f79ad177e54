//! RSI (Relative Strength Index) indicator

use crate::indicators::error::{ensure_finite, IndicatorError};
use crate::models::indicators::{RsiIndicator, RsiSignal};

/// Calculate RSI with Wilder smoothing
///
/// RSI = 100 - (100 / (1 + RS))
/// RS = Average Gain / Average Loss
///
/// The averages are seeded with the simple mean of the first `period`
/// deltas and then smoothed as `(prev * (period - 1) + current) / period`.
pub fn calculate_rsi(closes: &[f64], period: u32) -> Result<RsiIndicator, IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidPeriod { indicator: "RSI" });
    }
    let n = period as usize;
    if closes.len() < n + 1 {
        return Err(IndicatorError::InsufficientData {
            indicator: "RSI",
            required: n + 1,
            available: closes.len(),
        });
    }
    ensure_finite(closes)?;

    let mut gains = Vec::with_capacity(closes.len() - 1);
    let mut losses = Vec::with_capacity(closes.len() - 1);

    for pair in closes.windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(-change);
        }
    }

    let mut avg_gain = gains[..n].iter().sum::<f64>() / n as f64;
    let mut avg_loss = losses[..n].iter().sum::<f64>() / n as f64;

    for i in n..gains.len() {
        avg_gain = (avg_gain * (n as f64 - 1.0) + gains[i]) / n as f64;
        avg_loss = (avg_loss * (n as f64 - 1.0) + losses[i]) / n as f64;
    }

    let value = if avg_loss == 0.0 {
        // flat series has no direction
        if avg_gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - (100.0 / (1.0 + rs))
    };

    Ok(RsiIndicator { value, period })
}

/// Calculate RSI with default period (14)
pub fn calculate_rsi_default(closes: &[f64]) -> Result<RsiIndicator, IndicatorError> {
    calculate_rsi(closes, 14)
}

/// Map an RSI value onto its band. Both thresholds are inclusive.
pub fn classify_rsi(value: f64, overbought: f64, oversold: f64) -> RsiSignal {
    if value >= overbought {
        RsiSignal::Overbought
    } else if value <= oversold {
        RsiSignal::Oversold
    } else {
        RsiSignal::Neutral
    }
}
