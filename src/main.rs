mod api;
mod auction;
mod config;
mod db;
mod error;
mod ledger;
mod notify;
mod registry;
mod types;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::routes::{router, ApiState};
use crate::auction::sweep::Sweeper;
use crate::config::{Config, CHANNEL_CAPACITY};
use crate::error::Result;
use crate::notify::NotificationDispatcher;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", cfg.db_path)).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready at {}", cfg.db_path);

    let health = Arc::new(HealthState::new());

    // --- Notification dispatcher (fire-and-forget consumer) ---
    let (notify_tx, notify_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let dispatcher = NotificationDispatcher::new(notify_rx);
    tokio::spawn(async move { dispatcher.run().await });

    // --- Expiry sweeper (background, every sweep_interval_secs) ---
    let sweeper = Sweeper::new(
        pool.clone(),
        notify_tx.clone(),
        Arc::clone(&health),
        cfg.sweep_interval_secs,
    );
    tokio::spawn(async move { sweeper.run().await });
    info!("Sweeper running every {}s", cfg.sweep_interval_secs);

    // --- HTTP API server ---
    let api_state = ApiState { pool, health, notify_tx };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
