//! HTTP client for the Yahoo Finance chart endpoint

use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::messages::{ChartResponse, ChartResult};
use crate::services::error::SourceError;
use crate::services::market_data::Interval;

/// Yahoo rejects requests without a browser-like agent
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct YahooFinanceClient {
    base_url: String,
    http: reqwest::Client,
}

impl YahooFinanceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SourceError::Unavailable(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(base_url, http))
    }

    /// Use a pre-built client; tests point this at a mock server.
    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chart_url(
        &self,
        symbol: &str,
        interval: Interval,
        period1: i64,
        period2: i64,
    ) -> Result<Url, SourceError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SourceError::Unavailable(format!("invalid base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::Unavailable("base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        url.query_pairs_mut()
            .append_pair("interval", interval.as_str())
            .append_pair("period1", &period1.to_string())
            .append_pair("period2", &period2.to_string());
        Ok(url)
    }

    /// GET /v8/finance/chart/{symbol}
    #[instrument(skip(self), name = "yahoo::fetch_chart")]
    pub async fn fetch_chart(
        &self,
        symbol: &str,
        interval: Interval,
        period1: i64,
        period2: i64,
    ) -> Result<ChartResult, SourceError> {
        let url = self.chart_url(symbol, interval, period1, period2)?;
        let resp = self.http.get(url).send().await?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(symbol.to_string()));
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(SourceError::Unavailable(format!("chart endpoint returned {}", status)));
        }
        if !status.is_success() {
            return Err(SourceError::Query(format!("chart endpoint returned {}", status)));
        }

        let body: ChartResponse = resp
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        if let Some(err) = body.chart.error {
            return Err(if err.code.eq_ignore_ascii_case("not found") {
                SourceError::NotFound(symbol.to_string())
            } else {
                SourceError::Query(format!("{}: {}", err.code, err.description))
            });
        }

        let result = body
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| SourceError::NotFound(symbol.to_string()))?;

        debug!(symbol, rows = result.timestamp.len(), "Chart fetched");
        Ok(result)
    }
}
