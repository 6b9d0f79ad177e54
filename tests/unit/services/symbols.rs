//! Unit tests for symbol formatting and static sources

use stockwatch::services::symbols::{
    strip_suffix_ignore_case, StaticSymbols, SymbolFormat, SymbolSource,
};

#[test]
fn test_qualify_appends_suffix_once() {
    let format = SymbolFormat::new(".NS");
    assert_eq!(format.qualify("RELIANCE"), "RELIANCE.NS");
    assert_eq!(format.qualify(" TCS.NS "), "TCS.NS");
    assert_eq!(format.qualify("infy.ns"), "infy.ns");
}

#[test]
fn test_stored_case_survives_round_trip() {
    let format = SymbolFormat::new(".NS");
    let qualified = format.qualify("Reliance");
    assert_eq!(qualified, "Reliance.NS");
    assert_eq!(format.base(&qualified), "Reliance");
    assert_eq!(format.base("bajaj-auto.ns"), "bajaj-auto");
}

#[test]
fn test_suffix_is_normalised_to_uppercase() {
    let format = SymbolFormat::new(" .ns ");
    assert_eq!(format.suffix(), ".NS");
    assert_eq!(format.qualify("TCS"), "TCS.NS");
    assert_eq!(format.base("TCS.NS"), "TCS");
}

#[test]
fn test_strip_suffix_ignore_case() {
    assert_eq!(strip_suffix_ignore_case("INFY.ns", ".NS"), Some("INFY"));
    assert_eq!(strip_suffix_ignore_case("INFY", ".NS"), None);
    assert_eq!(strip_suffix_ignore_case("NS", ".NS"), None);
    assert_eq!(strip_suffix_ignore_case("₹.NS", ".NS"), Some("₹"));
}

#[test]
fn test_base_strips_suffix() {
    let format = SymbolFormat::new(".NS");
    assert_eq!(format.base("HDFCBANK.NS"), "HDFCBANK");
    assert_eq!(format.base("HDFCBANK"), "HDFCBANK");
}

#[test]
fn test_empty_suffix_is_identity() {
    let format = SymbolFormat::new("");
    assert_eq!(format.qualify(" aapl "), "aapl");
    assert_eq!(format.base("AAPL"), "AAPL");
}

#[tokio::test]
async fn test_static_symbols_lists_configured_values() {
    let source = StaticSymbols::new(["RELIANCE", "TCS"]);
    assert_eq!(
        source.list_symbols().await.unwrap(),
        vec!["RELIANCE".to_string(), "TCS".to_string()]
    );
    assert_eq!(source.name(), "static");
}
