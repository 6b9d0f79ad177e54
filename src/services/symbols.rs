//! Tracked symbol universe

use async_trait::async_trait;

use crate::services::error::SourceError;

/// Exchange suffix handling, e.g. `RELIANCE` <-> `RELIANCE.NS`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolFormat {
    suffix: String,
}

impl SymbolFormat {
    /// Exchange suffixes are matched without regard to case and emitted uppercase.
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into().trim().to_uppercase(),
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Append the suffix unless already present; the symbol keeps its case.
    pub fn qualify(&self, symbol: &str) -> String {
        let symbol = symbol.trim();
        if self.suffix.is_empty() || strip_suffix_ignore_case(symbol, &self.suffix).is_some() {
            symbol.to_string()
        } else {
            format!("{}{}", symbol, self.suffix)
        }
    }

    /// Symbol with the suffix removed
    pub fn base<'a>(&self, symbol: &'a str) -> &'a str {
        strip_suffix_ignore_case(symbol, &self.suffix).unwrap_or(symbol)
    }
}

/// `symbol` without a trailing `suffix`, compared ASCII case-insensitively
pub fn strip_suffix_ignore_case<'a>(symbol: &'a str, suffix: &str) -> Option<&'a str> {
    if suffix.is_empty() || symbol.len() < suffix.len() {
        return None;
    }
    let split = symbol.len() - suffix.len();
    let (head, tail) = (symbol.get(..split)?, symbol.get(split..)?);
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}

impl Default for SymbolFormat {
    fn default() -> Self {
        Self::new(".NS")
    }
}

#[async_trait]
pub trait SymbolSource: Send + Sync {
    /// Raw symbols, qualified later by the caller
    async fn list_symbols(&self) -> Result<Vec<String>, SourceError>;

    fn name(&self) -> &'static str;
}

/// Fixed list from configuration
#[derive(Debug, Clone)]
pub struct StaticSymbols {
    symbols: Vec<String>,
}

impl StaticSymbols {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl SymbolSource for StaticSymbols {
    async fn list_symbols(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.symbols.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
