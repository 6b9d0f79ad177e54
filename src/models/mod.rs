//! Shared data models spanning the engine layers.

pub mod indicators;
pub mod result;

pub use indicators::{
    closes, Bar, EmaIndicator, MacdCrossover, MacdIndicator, RsiIndicator, RsiSignal,
};
pub use result::{IndicatorResult, IndicatorValues, SymbolError};
