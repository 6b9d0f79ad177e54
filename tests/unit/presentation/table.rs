//! Unit tests for sorting and filtering the table

use stockwatch::models::indicators::{MacdCrossover, RsiSignal};
use stockwatch::models::result::{IndicatorResult, IndicatorValues};
use stockwatch::presentation::{Filter, SortKey, SortOrder, TableQuery};
use stockwatch::services::error::SourceError;

fn row(symbol: &str, rsi: f64, rsi_signal: RsiSignal, crossover: MacdCrossover, volume: u64) -> IndicatorResult {
    IndicatorResult::computed(
        symbol,
        IndicatorValues {
            price: rsi * 10.0,
            rsi,
            rsi_signal,
            macd: rsi / 100.0,
            macd_signal_line: 0.0,
            macd_histogram: rsi / 100.0 - 0.5,
            macd_crossover: crossover,
            volume,
        },
    )
}

fn rows() -> Vec<IndicatorResult> {
    vec![
        row("TCS.NS", 75.0, RsiSignal::Overbought, MacdCrossover::Bullish, 500),
        IndicatorResult::failed("BROKEN.NS", SourceError::NotFound("BROKEN.NS".into())),
        row("INFY.NS", 25.0, RsiSignal::Oversold, MacdCrossover::Below, 900),
        row("RELIANCE.NS", 50.0, RsiSignal::Neutral, MacdCrossover::Above, 100),
        IndicatorResult::failed("AAA.NS", SourceError::Timeout(std::time::Duration::from_secs(1))),
    ]
}

fn symbols(rows: &[&IndicatorResult]) -> Vec<String> {
    rows.iter().map(|r| r.symbol().to_string()).collect()
}

#[test]
fn test_default_sort_is_symbol_ascending_with_errors_last() {
    let data = rows();
    let sorted = TableQuery::default().apply(&data);
    assert_eq!(
        symbols(&sorted),
        vec!["INFY.NS", "RELIANCE.NS", "TCS.NS", "AAA.NS", "BROKEN.NS"]
    );
}

#[test]
fn test_sort_by_rsi_descending_keeps_errors_last() {
    let data = rows();
    let sorted = TableQuery::sorted_by(SortKey::Rsi, SortOrder::Desc).apply(&data);
    assert_eq!(
        symbols(&sorted),
        vec!["TCS.NS", "RELIANCE.NS", "INFY.NS", "AAA.NS", "BROKEN.NS"]
    );
}

#[test]
fn test_sort_by_volume_ascending() {
    let data = rows();
    let sorted = TableQuery::sorted_by(SortKey::Volume, SortOrder::Asc).apply(&data);
    assert_eq!(&symbols(&sorted)[..3], &["RELIANCE.NS", "TCS.NS", "INFY.NS"]);
}

#[test]
fn test_filter_by_rsi_band_excludes_errors() {
    let data = rows();
    let query = TableQuery::default().with_filter(Filter {
        rsi: Some(RsiSignal::Oversold),
        crossover: None,
    });
    assert_eq!(symbols(&query.apply(&data)), vec!["INFY.NS"]);
}

#[test]
fn test_filter_combines_band_and_crossover() {
    let data = rows();
    let matching = TableQuery::default().with_filter(Filter {
        rsi: Some(RsiSignal::Overbought),
        crossover: Some(MacdCrossover::Bullish),
    });
    assert_eq!(symbols(&matching.apply(&data)), vec!["TCS.NS"]);

    let none = TableQuery::default().with_filter(Filter {
        rsi: Some(RsiSignal::Overbought),
        crossover: Some(MacdCrossover::Bearish),
    });
    assert!(none.apply(&data).is_empty());
}

#[test]
fn test_sort_key_and_order_parsing() {
    assert_eq!("macd_hist".parse::<SortKey>(), Ok(SortKey::Histogram));
    assert_eq!("RSI".parse::<SortKey>(), Ok(SortKey::Rsi));
    assert_eq!("desc".parse::<SortOrder>(), Ok(SortOrder::Desc));
    assert!("sideways".parse::<SortOrder>().is_err());
}
