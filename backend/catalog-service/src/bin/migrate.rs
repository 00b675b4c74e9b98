//! Apply pending schema migrations and list what is applied.
//! Run with: cargo run --bin catalog-migrate -- [path/to/config.toml]

use catalog_service::{config::Config, db::Database, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load(std::env::args().nth(1))?;
    telemetry::init(&config.log)?;

    let db = Database::connect(&config, "catalog-migrate").await?;
    db.run_migrations().await?;

    for (version, description) in db.applied_migrations().await? {
        println!("{version} {description}");
    }

    db.close().await;
    Ok(())
}
