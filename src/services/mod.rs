pub mod error;
pub mod market_data;
pub mod symbols;
pub mod yahoo;

pub use error::SourceError;
pub use market_data::{BarQuery, FallbackProvider, Interval, Lookback, MarketDataProvider};
pub use symbols::{StaticSymbols, SymbolFormat, SymbolSource};
