//! EMA (Exponential Moving Average) indicator

use crate::common::math;
use crate::indicators::error::{ensure_finite, IndicatorError};
use crate::models::indicators::EmaIndicator;

/// Calculate EMA for a specific period
pub fn calculate_ema(closes: &[f64], period: u32) -> Result<EmaIndicator, IndicatorError> {
    let series = calculate_ema_series(closes, period)?;
    let value = series.last().copied().ok_or(IndicatorError::InsufficientData {
        indicator: "EMA",
        required: period as usize,
        available: closes.len(),
    })?;

    Ok(EmaIndicator { value, period })
}

/// Validated EMA series; element `i` aligns with `closes[i + period - 1]`
pub fn calculate_ema_series(closes: &[f64], period: u32) -> Result<Vec<f64>, IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidPeriod { indicator: "EMA" });
    }
    if closes.len() < period as usize {
        return Err(IndicatorError::InsufficientData {
            indicator: "EMA",
            required: period as usize,
            available: closes.len(),
        });
    }
    ensure_finite(closes)?;

    math::ema_series(closes, period as usize).ok_or(IndicatorError::InsufficientData {
        indicator: "EMA",
        required: period as usize,
        available: closes.len(),
    })
}
