//! Learn2Earn status sync daemon
//!
//! Connects to Postgres, runs migrations, then keeps the daily status sync
//! scheduled until Ctrl-C.

use anyhow::{Context, Result};
use learn2earn_sync_core::domains::learn2earn::PgOpportunityStore;
use learn2earn_sync_core::kernel::{start_scheduler, SyncDeps};
use learn2earn_sync_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,learn2earn_sync_core=debug,sqlx=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting Learn2Earn status sync");

    let config = Config::from_env().context("Failed to load configuration")?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let store = PgOpportunityStore::new(pool);
    let deps = SyncDeps::postgres(store.clone());

    let mut scheduler = start_scheduler(deps, &config.sync)
        .await
        .context("Failed to start scheduler")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    tracing::info!("Shutting down");
    scheduler
        .shutdown()
        .await
        .context("Failed to stop scheduler")?;
    store.close().await;

    Ok(())
}
