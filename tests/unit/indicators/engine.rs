//! Unit tests for the indicator engine

use stockwatch::indicators::{IndicatorEngine, IndicatorError, IndicatorSettings};
use stockwatch::models::indicators::{MacdCrossover, RsiSignal};

use crate::support::{bars_from_closes, flat_then_drop, flat_then_rise, rising};

#[test]
fn test_default_settings() {
    let settings = IndicatorSettings::default();
    assert_eq!(settings.rsi_period, 14);
    assert_eq!(
        (settings.macd_fast, settings.macd_slow, settings.macd_signal),
        (12, 26, 9)
    );
    assert_eq!(settings.min_bars(), 35);
}

#[test]
fn test_short_history_is_insufficient_data() {
    let engine = IndicatorEngine::default();
    let bars = bars_from_closes(&rising(20, 100.0, 1.0));
    let err = engine.evaluate(&bars, None).unwrap_err();
    assert!(matches!(
        err,
        IndicatorError::InsufficientData {
            indicator: "MACD",
            required: 35,
            available: 20,
        }
    ));
}

#[test]
fn test_empty_history_is_insufficient_data() {
    let engine = IndicatorEngine::default();
    assert!(matches!(
        engine.evaluate(&[], None),
        Err(IndicatorError::InsufficientData { available: 0, .. })
    ));
}

#[test]
fn test_values_come_from_last_bar() {
    let engine = IndicatorEngine::default();
    let closes = flat_then_rise();
    let bars = bars_from_closes(&closes);
    let values = engine.evaluate(&bars, None).unwrap();

    assert_eq!(values.price, 105.0);
    assert_eq!(values.volume, bars.last().unwrap().volume);
    assert_eq!(values.rsi_signal, RsiSignal::Overbought);
    assert!((values.macd_histogram - (values.macd - values.macd_signal_line)).abs() < 1e-12);
}

#[test]
fn test_first_cycle_uses_previous_bar_histogram() {
    let engine = IndicatorEngine::default();
    // the histogram was already positive one bar earlier
    let up = engine.evaluate(&bars_from_closes(&flat_then_rise()), None).unwrap();
    assert_eq!(up.macd_crossover, MacdCrossover::Above);

    let down = engine.evaluate(&bars_from_closes(&flat_then_drop()), None).unwrap();
    assert_eq!(down.macd_crossover, MacdCrossover::Below);
    assert_eq!(down.rsi_signal, RsiSignal::Oversold);
}

#[test]
fn test_previous_snapshot_histogram_wins() {
    let engine = IndicatorEngine::default();
    let up = engine
        .evaluate(&bars_from_closes(&flat_then_rise()), Some(-0.25))
        .unwrap();
    assert_eq!(up.macd_crossover, MacdCrossover::Bullish);

    let down = engine
        .evaluate(&bars_from_closes(&flat_then_drop()), Some(0.25))
        .unwrap();
    assert_eq!(down.macd_crossover, MacdCrossover::Bearish);
}

#[test]
fn test_evaluation_is_deterministic() {
    let engine = IndicatorEngine::default();
    let closes: Vec<f64> = (0..90).map(|i| 50.0 + (i as f64 * 0.7).cos() * 3.0).collect();
    let bars = bars_from_closes(&closes);
    assert_eq!(
        engine.evaluate(&bars, Some(0.1)).unwrap(),
        engine.evaluate(&bars, Some(0.1)).unwrap()
    );
}
