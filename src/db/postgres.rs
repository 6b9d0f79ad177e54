//! PostgreSQL price table access

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error, info, warn};

use crate::config::DatabaseConfig;
use crate::models::indicators::Bar;
use crate::services::error::SourceError;
use crate::services::market_data::{
    apply_lookback, normalize_bars, BarQuery, Lookback, MarketDataProvider,
};
use crate::services::symbols::{SymbolFormat, SymbolSource};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_ATTEMPTS: usize = 3;

/// Read-only access to the `(stock, date, open, high, low, close, volume)` table.
///
/// The client is opened lazily and reopened after the connection drops.
pub struct PriceDatabase {
    settings: DatabaseConfig,
    format: SymbolFormat,
    client: RwLock<Option<Arc<Client>>>,
}

impl PriceDatabase {
    /// Disconnected handle; the first query opens the connection.
    pub fn new(settings: DatabaseConfig, format: SymbolFormat) -> Self {
        Self {
            settings,
            format,
            client: RwLock::new(None),
        }
    }

    /// Connect up front, retrying with exponential backoff.
    pub async fn connect(settings: DatabaseConfig, format: SymbolFormat) -> Result<Self, SourceError> {
        let db = Self::new(settings, format);
        let client = (|| db.open())
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(200))
                    .with_max_times(CONNECT_ATTEMPTS),
            )
            .when(|e: &SourceError| e.is_connectivity())
            .notify(|e: &SourceError, delay: Duration| {
                warn!(error = %e, ?delay, "Database connect failed, retrying");
            })
            .await?;
        *db.client.write().await = Some(client);
        info!(table = %db.settings.qualified_table(), "Connected to price database");
        Ok(db)
    }

    fn pg_config(&self) -> Result<tokio_postgres::Config, SourceError> {
        let mut config = match &self.settings.url {
            Some(url) => url
                .parse::<tokio_postgres::Config>()
                .map_err(|e| SourceError::Unavailable(format!("invalid DATABASE_URL: {}", e)))?,
            None => {
                let mut config = tokio_postgres::Config::new();
                config
                    .host(&self.settings.host)
                    .port(self.settings.port)
                    .dbname(&self.settings.name)
                    .user(&self.settings.user)
                    .password(&self.settings.password);
                config
            }
        };
        config.connect_timeout(CONNECT_TIMEOUT);
        Ok(config)
    }

    async fn open(&self) -> Result<Arc<Client>, SourceError> {
        let (client, connection) = self
            .pg_config()?
            .connect(NoTls)
            .await
            .map_err(|e| SourceError::Unavailable(format!("Failed to connect to database: {}", e)))?;

        // Spawn connection task
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "Database connection error");
            }
        });

        Ok(Arc::new(client))
    }

    /// Live client, reconnecting when the previous one has closed
    async fn client(&self) -> Result<Arc<Client>, SourceError> {
        if let Some(client) = self.client.read().await.as_ref() {
            if !client.is_closed() {
                return Ok(client.clone());
            }
        }

        let mut guard = self.client.write().await;
        if let Some(client) = guard.as_ref() {
            if !client.is_closed() {
                return Ok(client.clone());
            }
            debug!("Database connection closed, reconnecting");
        }
        let client = self.open().await?;
        *guard = Some(client.clone());
        Ok(client)
    }

    pub async fn is_connected(&self) -> bool {
        matches!(self.client.read().await.as_ref(), Some(c) if !c.is_closed())
    }

    pub fn format(&self) -> &SymbolFormat {
        &self.format
    }

    /// Distinct symbols present in the price table
    pub async fn list_symbols(&self) -> Result<Vec<String>, SourceError> {
        let client = self.client().await?;
        let sql = format!(
            "SELECT DISTINCT stock::text FROM {} WHERE stock IS NOT NULL ORDER BY 1",
            self.settings.qualified_table()
        );
        let rows = client.query(sql.as_str(), &[]).await.map_err(map_pg_error)?;

        rows.iter()
            .map(|row| {
                row.try_get::<_, String>(0)
                    .map_err(|e| SourceError::Malformed(format!("stock column: {}", e)))
            })
            .collect()
    }

    /// Latest `limit` bars for the unqualified symbol, oldest first
    pub async fn get_recent_bars(&self, symbol: &str, limit: usize) -> Result<Vec<Bar>, SourceError> {
        let client = self.client().await?;
        let sql = format!(
            "SELECT date::date, open::float8, high::float8, low::float8, close::float8, volume::float8
             FROM {}
             WHERE stock = $1
             ORDER BY date DESC
             LIMIT $2",
            self.settings.qualified_table()
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = client
            .query(sql.as_str(), &[&symbol, &limit])
            .await
            .map_err(map_pg_error)?;

        let mut bars = rows.iter().map(row_to_bar).collect::<Result<Vec<_>, _>>()?;
        bars.reverse();
        Ok(bars)
    }

    /// Bars with `start <= date <= end` for the unqualified symbol
    pub async fn get_bars_between(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, SourceError> {
        let client = self.client().await?;
        let sql = format!(
            "SELECT date::date, open::float8, high::float8, low::float8, close::float8, volume::float8
             FROM {}
             WHERE stock = $1 AND date::date BETWEEN $2 AND $3
             ORDER BY date ASC",
            self.settings.qualified_table()
        );
        let rows = client
            .query(sql.as_str(), &[&symbol, &start, &end])
            .await
            .map_err(map_pg_error)?;

        rows.iter().map(row_to_bar).collect()
    }
}

fn row_to_bar(row: &Row) -> Result<Bar, SourceError> {
    let date: NaiveDate = row
        .try_get(0)
        .map_err(|e| SourceError::Malformed(format!("date column: {}", e)))?;
    let price = |idx: usize, name: &str| -> Result<f64, SourceError> {
        row.try_get::<_, Option<f64>>(idx)
            .map_err(|e| SourceError::Malformed(format!("{} column: {}", name, e)))?
            .ok_or_else(|| SourceError::Malformed(format!("null {} on {}", name, date)))
    };
    let volume: Option<f64> = row
        .try_get(5)
        .map_err(|e| SourceError::Malformed(format!("volume column: {}", e)))?;

    Ok(Bar::new(
        date,
        price(1, "open")?,
        price(2, "high")?,
        price(3, "low")?,
        price(4, "close")?,
        volume.unwrap_or(0.0).max(0.0) as u64,
    ))
}

/// Server-side errors are query errors; anything else means the link is down.
fn map_pg_error(err: tokio_postgres::Error) -> SourceError {
    if err.as_db_error().is_some() {
        SourceError::Query(err.to_string())
    } else {
        SourceError::Unavailable(err.to_string())
    }
}

#[async_trait]
impl MarketDataProvider for PriceDatabase {
    async fn get_bars(&self, query: &BarQuery) -> Result<Vec<Bar>, SourceError> {
        let symbol = self.format.base(&query.symbol);
        let bars = match query.lookback {
            Lookback::Bars(n) => self.get_recent_bars(symbol, n).await?,
            Lookback::Range { start, end } => self.get_bars_between(symbol, start, end).await?,
        };
        let bars = apply_lookback(normalize_bars(bars), &query.lookback);
        if bars.is_empty() {
            return Err(SourceError::NotFound(query.symbol.clone()));
        }
        Ok(bars)
    }

    fn name(&self) -> &'static str {
        "database"
    }
}

#[async_trait]
impl SymbolSource for PriceDatabase {
    async fn list_symbols(&self) -> Result<Vec<String>, SourceError> {
        PriceDatabase::list_symbols(self).await
    }

    fn name(&self) -> &'static str {
        "database"
    }
}
