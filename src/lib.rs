//! Stockwatch: daily RSI/MACD dashboard for a tracked list of equities.
//!
//! Bars come from a PostgreSQL price table or the Yahoo Finance chart API,
//! indicators are computed per refresh cycle and the latest snapshot is
//! served as a sortable, filterable table.

pub mod common;
pub mod config;
pub mod core;
pub mod db;
pub mod indicators;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod presentation;
pub mod services;
