//! Stockwatch Server
//!
//! Starts the refresh scheduler and the HTTP dashboard/API.

use stockwatch::config::AppConfig;
use stockwatch::core::http::start_server;
use stockwatch::logging::init_logging_for;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    init_logging_for(&config.environment);

    info!(
        environment = %config.environment,
        port = config.port,
        data_source = ?config.data_source,
        symbols = config.symbols.len(),
        refresh_interval_secs = config.refresh.interval.as_secs(),
        refresh_cron = ?config.refresh.cron,
        "Starting Stockwatch server"
    );

    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(config).await {
            error!(error = %e, "HTTP server error");
        }
    });

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutting down...");
        }
        _ = server_handle => {
            error!("HTTP server stopped");
        }
    }

    Ok(())
}
