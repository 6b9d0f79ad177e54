//! Single-writer, multi-reader handoff of the latest results

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

use crate::models::result::IndicatorResult;

/// A value replaced wholesale; readers hold the `Arc` they got.
#[derive(Debug)]
pub struct Published<T> {
    current: RwLock<Arc<T>>,
}

impl<T> Published<T> {
    pub fn new(initial: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    pub fn load(&self) -> Arc<T> {
        self.current.read().clone()
    }

    /// Swap in a new value, returning the previous one
    pub fn publish(&self, next: T) -> Arc<T> {
        let next = Arc::new(next);
        std::mem::replace(&mut *self.current.write(), next)
    }
}

impl<T: Default> Default for Published<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Complete result set of one refresh cycle
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Zero until the first cycle publishes
    pub cycle: u64,
    pub generated_at: DateTime<Utc>,
    pub results: Vec<IndicatorResult>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            cycle: 0,
            generated_at: Utc::now(),
            results: Vec::new(),
        }
    }

    /// Row for `symbol`, ignoring ASCII case
    pub fn get(&self, symbol: &str) -> Option<&IndicatorResult> {
        self.results
            .iter()
            .find(|r| r.symbol().eq_ignore_ascii_case(symbol))
    }

    /// Histogram of a successfully computed row
    pub fn histogram(&self, symbol: &str) -> Option<f64> {
        self.get(symbol)
            .and_then(|r| r.values())
            .map(|v| v.macd_histogram)
    }

    pub fn symbols(&self) -> Vec<String> {
        self.results.iter().map(|r| r.symbol().to_string()).collect()
    }

    pub fn error_count(&self) -> usize {
        self.results.iter().filter(|r| !r.is_ok()).count()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}
