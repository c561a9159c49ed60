//! Reviewer Service - assigns and rebalances pull request reviewers in teams.
//!
//! The library holds the storage layer, the assignment and deactivation
//! engines and the HTTP API; the binary only parses configuration, installs
//! logging and calls [`run`].

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod server;
pub mod services;

use config::Config;
use error::AppError;
use services::{AssignmentEngine, ReviewerSelector};
use tokio_util::sync::CancellationToken;

/// Open the database, start the HTTP server and block until shutdown.
pub async fn run(config: Config) -> Result<(), AppError> {
    log::info!(
        "[startup] Opening database at {} (max {} connections)",
        config.database.display(),
        config.max_connections
    );
    let pool = db::initialize(&config.database, config.max_connections).await?;

    let engine = AssignmentEngine::new(pool.clone(), ReviewerSelector::from_entropy());
    let app = api::router(api::AppState::new(engine), config.request_timeout());

    let listener = server::bind(config.listen_addr())
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", config.listen_addr(), e)))?;

    let shutdown = CancellationToken::new();
    server::cancel_on_signal(shutdown.clone());

    server::serve(listener, app, shutdown, config.shutdown_timeout())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    pool.close().await;
    log::info!("[startup] Database closed");

    Ok(())
}
