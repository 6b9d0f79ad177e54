//! Sort and filter over a read-only snapshot

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

use crate::models::indicators::{MacdCrossover, RsiSignal};
use crate::models::result::{IndicatorResult, IndicatorValues};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Symbol,
    Price,
    Rsi,
    Macd,
    Histogram,
    Volume,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "symbol" => Ok(SortKey::Symbol),
            "price" => Ok(SortKey::Price),
            "rsi" => Ok(SortKey::Rsi),
            "macd" => Ok(SortKey::Macd),
            "histogram" | "macd_histogram" | "macd_hist" => Ok(SortKey::Histogram),
            "volume" => Ok(SortKey::Volume),
            other => Err(format!("unknown sort key '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sort order '{}'", other)),
        }
    }
}

/// Row predicate. Errored rows never match a non-empty filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Filter {
    pub rsi: Option<RsiSignal>,
    pub crossover: Option<MacdCrossover>,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.rsi.is_none() && self.crossover.is_none()
    }

    pub fn matches(&self, row: &IndicatorResult) -> bool {
        if self.is_empty() {
            return true;
        }
        let Some(values) = row.values() else {
            return false;
        };
        self.rsi.map_or(true, |band| values.rsi_signal == band)
            && self
                .crossover
                .map_or(true, |class| values.macd_crossover == class)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableQuery {
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    pub filter: Filter,
}

impl TableQuery {
    pub fn sorted_by(sort_key: SortKey, sort_order: SortOrder) -> Self {
        Self {
            sort_key,
            sort_order,
            filter: Filter::default(),
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Filtered rows in display order; errored rows always come last.
    pub fn apply<'a>(&self, rows: &'a [IndicatorResult]) -> Vec<&'a IndicatorResult> {
        let mut out: Vec<&IndicatorResult> = rows.iter().filter(|r| self.filter.matches(r)).collect();
        out.sort_by(|a, b| self.compare(a, b));
        out
    }

    fn compare(&self, a: &IndicatorResult, b: &IndicatorResult) -> Ordering {
        let ordering = match (a.values(), b.values()) {
            (Some(va), Some(vb)) => {
                let ord = match self.sort_key {
                    SortKey::Symbol => a.symbol().cmp(b.symbol()),
                    _ => numeric(self.sort_key, va).total_cmp(&numeric(self.sort_key, vb)),
                };
                match self.sort_order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            }
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (None, None) => a.symbol().cmp(b.symbol()),
        };
        // stable tie-break
        ordering.then_with(|| a.symbol().cmp(b.symbol()))
    }
}

fn numeric(key: SortKey, values: &IndicatorValues) -> f64 {
    match key {
        SortKey::Price => values.price,
        SortKey::Rsi => values.rsi,
        SortKey::Macd => values.macd,
        SortKey::Histogram => values.macd_histogram,
        SortKey::Volume => values.volume as f64,
        SortKey::Symbol => 0.0,
    }
}
