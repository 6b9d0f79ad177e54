//! Run a single refresh cycle and print the table to stdout.
//!
//! Usage: refresh-once [sort_key] [asc|desc]

use std::env;

use stockwatch::config::AppConfig;
use stockwatch::core::bootstrap::{build_pipeline, connect_sources};
use stockwatch::core::snapshot::Snapshot;
use stockwatch::logging::init_logging_for;
use stockwatch::presentation::{render_text, SortKey, SortOrder, TableQuery};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    init_logging_for(&config.environment);

    let mut args = env::args().skip(1);
    let sort_key: SortKey = args.next().as_deref().unwrap_or("symbol").parse()?;
    let sort_order: SortOrder = args.next().as_deref().unwrap_or("asc").parse()?;

    let sources = connect_sources(&config).await?;
    let pipeline = build_pipeline(&config, &sources, None);
    let snapshot = pipeline.run_cycle(&Snapshot::empty()).await?;

    let rows = TableQuery::sorted_by(sort_key, sort_order).apply(&snapshot.results);
    println!(
        "Last updated: {}",
        snapshot.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    print!("{}", render_text(&rows, pipeline.format().suffix()));

    Ok(())
}
