use std::time::Duration;
use thiserror::Error;

/// Failure reported by a market data or symbol source
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    #[error("data source unavailable: {0}")]
    Unavailable(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("no data for symbol {0}")]
    NotFound(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("query failed: {0}")]
    Query(String),
}

impl SourceError {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Unavailable(_) => "unavailable",
            SourceError::Timeout(_) => "timeout",
            SourceError::NotFound(_) => "not_found",
            SourceError::Malformed(_) => "malformed",
            SourceError::Query(_) => "query",
        }
    }

    /// The source itself could not be reached
    pub fn is_connectivity(&self) -> bool {
        matches!(self, SourceError::Unavailable(_) | SourceError::Timeout(_))
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::Malformed(err.to_string())
        } else {
            SourceError::Unavailable(err.to_string())
        }
    }
}
