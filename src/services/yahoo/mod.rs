//! Yahoo Finance chart API adapter

pub mod client;
pub mod messages;
pub mod provider;

pub use client::YahooFinanceClient;
pub use provider::YahooFinanceProvider;
