//! Database migration runner for ApplyTrack.
//!
//! Usage:
//!   migrator up      - Run all pending migrations
//!   migrator down    - Rollback last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations

use anyhow::{Context, bail};
use applytrack_db::migration::Migrator;
use applytrack_shared::{AppConfig, telemetry};
use sea_orm_migration::prelude::*;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    telemetry::init_tracing(&config.logging)?;

    let command = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());
    let db = applytrack_db::connect(&config.database)
        .await
        .context("failed to connect to database")?;

    match command.as_str() {
        "up" => Migrator::up(&db, None).await?,
        "down" => Migrator::down(&db, Some(1)).await?,
        "status" => Migrator::status(&db).await?,
        "fresh" => Migrator::fresh(&db).await?,
        other => bail!("unknown command '{other}', expected up, down, status or fresh"),
    }

    info!(%command, "migration command finished");
    Ok(())
}
