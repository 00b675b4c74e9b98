//! Import a catalog CSV file from the command line.
//! Run with: cargo run --bin catalog-load -- [path/to/file.csv]
//!
//! Without an argument the configured `catalog.default_csv_path` is used.

use std::path::PathBuf;

use catalog_service::{config::Config, db::Database, telemetry, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load(None)?;
    telemetry::init(&config.log)?;
    config.validate().map_err(anyhow::Error::msg)?;

    let csv_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&config.catalog.default_csv_path));

    let db = Database::connect(&config, "catalog-load").await?;
    if config.database.run_migrations {
        db.run_migrations().await?;
    }

    let state = AppState::postgres(&db, config)?;
    let report = state.data_loader().load_file(&csv_path).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    db.close().await;
    Ok(())
}
