//! Environment-driven configuration
//!
//! Every setting has a default so the service starts with an empty
//! environment. Values that are present but malformed are rejected with
//! [`ConfigError`] instead of being silently replaced.

use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::indicators::engine::IndicatorSettings;
use crate::services::market_data::Interval;

/// Symbols tracked when neither the database nor `SYMBOLS` provides a list.
pub const DEFAULT_SYMBOLS: [&str; 5] = [
    "RELIANCE.NS",
    "TCS.NS",
    "HDFCBANK.NS",
    "INFY.NS",
    "HINDUNILVR.NS",
];

pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("{name} must be at least {min}, got {value}")]
    TooSmall {
        name: &'static str,
        min: u64,
        value: u64,
    },
}

/// Name of the running environment (`APP_ENV`), defaults to `development`.
pub fn get_environment() -> String {
    env::var("APP_ENV")
        .ok()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "development".to_string())
}

pub fn is_production(environment: &str) -> bool {
    matches!(environment, "production" | "prod")
}

/// Where bars are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSourceKind {
    Database,
    Yahoo,
    /// Database first, Yahoo when the database errors or has no rows.
    DatabaseWithFallback,
}

impl DataSourceKind {
    pub fn uses_database(self) -> bool {
        !matches!(self, DataSourceKind::Yahoo)
    }
}

impl FromStr for DataSourceKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "database" | "db" | "postgres" => Ok(DataSourceKind::Database),
            "yahoo" | "api" => Ok(DataSourceKind::Yahoo),
            "database_with_fallback" | "fallback" => Ok(DataSourceKind::DatabaseWithFallback),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Full connection string; wins over the discrete fields when set.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub schema: String,
    pub table: String,
}

impl DatabaseConfig {
    /// Schema-qualified price table, both parts validated as identifiers.
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
    pub interval: Duration,
    /// Six-field cron expression; replaces the fixed interval when present.
    pub cron: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub environment: String,
    pub port: u16,
    pub data_source: DataSourceKind,
    pub database: DatabaseConfig,
    pub yahoo_base_url: String,
    pub symbols: Vec<String>,
    pub symbol_suffix: String,
    pub bar_interval: Interval,
    pub refresh: RefreshConfig,
    pub lookback_bars: usize,
    pub fetch_timeout: Duration,
    pub fetch_concurrency: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup: &lookup };

        let database = DatabaseConfig {
            url: vars.opt("DATABASE_URL"),
            host: vars.string("DB_HOST", "localhost"),
            port: vars.parse("DB_PORT", 5432)?,
            name: vars.string("DB_NAME", "postgres"),
            user: vars.string("DB_USER", "postgres"),
            password: vars.string("DB_PASSWORD", ""),
            schema: vars.identifier("DB_SCHEMA", "public")?,
            table: vars.identifier("DB_TABLE", "pelago")?,
        };

        let symbols = match vars.opt("SYMBOLS") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
        };

        let lookback_bars: usize = vars.parse("LOOKBACK_BARS", 120)?;
        let min_bars = IndicatorSettings::default().min_bars();
        if lookback_bars < min_bars {
            return Err(ConfigError::TooSmall {
                name: "LOOKBACK_BARS",
                min: min_bars as u64,
                value: lookback_bars as u64,
            });
        }

        let interval_secs: u64 = vars.parse("REFRESH_INTERVAL_SECONDS", 30)?;
        if interval_secs == 0 {
            return Err(ConfigError::TooSmall {
                name: "REFRESH_INTERVAL_SECONDS",
                min: 1,
                value: 0,
            });
        }

        let fetch_concurrency: usize = vars.parse("FETCH_CONCURRENCY", 5)?;

        Ok(Self {
            environment: vars
                .string("APP_ENV", "development")
                .to_lowercase(),
            port: vars.parse("PORT", 5000)?,
            data_source: vars.parse("DATA_SOURCE", DataSourceKind::DatabaseWithFallback)?,
            database,
            yahoo_base_url: vars.string("YAHOO_BASE_URL", DEFAULT_YAHOO_BASE_URL),
            symbols,
            symbol_suffix: vars.string("SYMBOL_SUFFIX", ".NS"),
            bar_interval: vars.parse("BAR_INTERVAL", Interval::Daily)?,
            refresh: RefreshConfig {
                interval: Duration::from_secs(interval_secs),
                cron: vars.opt("REFRESH_CRON"),
            },
            lookback_bars,
            fetch_timeout: Duration::from_secs(vars.parse("FETCH_TIMEOUT_SECONDS", 10)?),
            fetch_concurrency: fetch_concurrency.max(1),
        })
    }
}

struct Vars<'a, F> {
    lookup: &'a F,
}

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn opt(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn string(&self, name: &str, default: &str) -> String {
        self.opt(name).unwrap_or_else(|| default.to_string())
    }

    fn parse<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.opt(name) {
            Some(raw) => match raw.parse() {
                Ok(value) => Ok(value),
                Err(_) => Err(ConfigError::Invalid { name, value: raw }),
            },
            None => Ok(default),
        }
    }

    fn identifier(&self, name: &'static str, default: &str) -> Result<String, ConfigError> {
        let value = self.string(name, default);
        let mut chars = value.chars();
        let valid = chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false)
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(value)
        } else {
            Err(ConfigError::Invalid { name, value })
        }
    }
}
