//! Unit tests for the market data boundary helpers

use std::sync::Arc;

use stockwatch::models::indicators::Bar;
use stockwatch::services::error::SourceError;
use stockwatch::services::market_data::{
    apply_lookback, normalize_bars, BarQuery, FallbackProvider, Interval, Lookback,
    MarketDataProvider,
};

use crate::support::{day, rising, FakeProvider};

fn bar(i: usize, close: f64) -> Bar {
    Bar::new(day(i), close, close, close, close, 10)
}

#[test]
fn test_normalize_sorts_ascending_and_dedupes() {
    let bars = vec![bar(3, 3.0), bar(1, 1.0), bar(2, 2.0), bar(1, 1.5)];
    let normalized = normalize_bars(bars);

    let dates: Vec<_> = normalized.iter().map(|b| b.date).collect();
    assert_eq!(dates, vec![day(1), day(2), day(3)]);
    // later row for a duplicated date wins
    assert_eq!(normalized[0].close, 1.5);
}

#[test]
fn test_apply_lookback_keeps_latest_bars() {
    let bars: Vec<Bar> = (0..10).map(|i| bar(i, i as f64)).collect();
    let recent = apply_lookback(bars.clone(), &Lookback::Bars(3));
    assert_eq!(recent.iter().map(|b| b.close).collect::<Vec<_>>(), vec![7.0, 8.0, 9.0]);

    let all = apply_lookback(bars, &Lookback::Bars(50));
    assert_eq!(all.len(), 10);
}

#[test]
fn test_apply_lookback_range_is_inclusive() {
    let bars: Vec<Bar> = (0..10).map(|i| bar(i, i as f64)).collect();
    let window = apply_lookback(
        bars,
        &Lookback::Range {
            start: day(2),
            end: day(4),
        },
    );
    assert_eq!(window.len(), 3);
    assert_eq!(window.first().unwrap().date, day(2));
    assert_eq!(window.last().unwrap().date, day(4));
}

#[test]
fn test_interval_parsing() {
    assert_eq!("1d".parse::<Interval>(), Ok(Interval::Daily));
    assert_eq!("Weekly".parse::<Interval>(), Ok(Interval::Weekly));
    assert!("5m".parse::<Interval>().is_err());
    assert_eq!(Interval::Weekly.as_str(), "1wk");
    assert!(Interval::Daily.calendar_days_for(120) > 120);
}

#[tokio::test]
async fn test_fallback_used_when_primary_errors() {
    let primary = Arc::new(
        FakeProvider::new().with_error("INFY.NS", SourceError::Unavailable("down".into())),
    );
    let fallback = Arc::new(FakeProvider::new().with("INFY.NS", &rising(40, 10.0, 1.0)));
    let provider = FallbackProvider::new(primary.clone(), fallback.clone());

    let bars = provider
        .get_bars(&BarQuery::recent("INFY.NS", Interval::Daily, 40))
        .await
        .unwrap();
    assert_eq!(bars.len(), 40);
    assert_eq!(primary.calls(), 1);
    assert_eq!(fallback.calls(), 1);
}

#[tokio::test]
async fn test_fallback_used_when_primary_has_no_rows() {
    let primary = Arc::new(FakeProvider::new().with("TCS.NS", &[]));
    let fallback = Arc::new(FakeProvider::new().with("TCS.NS", &rising(5, 10.0, 1.0)));
    let provider = FallbackProvider::new(primary, fallback.clone());

    let bars = provider
        .get_bars(&BarQuery::recent("TCS.NS", Interval::Daily, 5))
        .await
        .unwrap();
    assert_eq!(bars.len(), 5);
    assert_eq!(fallback.calls(), 1);
}

#[tokio::test]
async fn test_fallback_skipped_when_primary_succeeds() {
    let primary = Arc::new(FakeProvider::new().with("TCS.NS", &rising(5, 10.0, 1.0)));
    let fallback = Arc::new(FakeProvider::new());
    let provider = FallbackProvider::new(primary, fallback.clone());

    provider
        .get_bars(&BarQuery::recent("TCS.NS", Interval::Daily, 5))
        .await
        .unwrap();
    assert_eq!(fallback.calls(), 0);
}

#[tokio::test]
async fn test_fallback_error_surfaces() {
    let primary = Arc::new(FakeProvider::new());
    let fallback = Arc::new(FakeProvider::new());
    let provider = FallbackProvider::new(primary, fallback);

    let err = provider
        .get_bars(&BarQuery::recent("XYZ.NS", Interval::Daily, 5))
        .await
        .unwrap_err();
    assert_eq!(err, SourceError::NotFound("XYZ.NS".into()));
}
