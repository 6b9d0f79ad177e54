//! Moving-average primitives shared by the indicators

/// Simple mean of the first `period` values
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    Some(values[..period].iter().sum::<f64>() / period as f64)
}

/// Smoothing factor `2 / (period + 1)`
pub fn ema_alpha(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

/// One EMA step from the previous average
pub fn ema_from_previous(value: f64, previous: f64, period: usize) -> f64 {
    let k = ema_alpha(period);
    value * k + previous * (1.0 - k)
}

/// Full EMA series, seeded with the SMA of the first `period` values.
///
/// Element `i` of the result lines up with `values[i + period - 1]`, so the
/// series has `values.len() - period + 1` entries.
pub fn ema_series(values: &[f64], period: usize) -> Option<Vec<f64>> {
    let seed = sma(values, period)?;
    let mut series = Vec::with_capacity(values.len() - period + 1);
    series.push(seed);

    let mut previous = seed;
    for &value in &values[period..] {
        previous = ema_from_previous(value, previous, period);
        series.push(previous);
    }

    Some(series)
}

/// Latest EMA value
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    ema_series(values, period).and_then(|s| s.last().copied())
}
