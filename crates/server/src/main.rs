mod bootstrap;
mod health;
pub mod portal;
pub mod sessions;
pub mod state;

use std::time::Duration;

use anyhow::Result;
use reforma_core::config::{AppConfig, LoadOptions};

use crate::sessions::SessionStore;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

fn init_logging(config: &AppConfig) {
    use reforma_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    // Now bootstrap using the same config we already loaded
    let state = bootstrap::bootstrap_with_config(config)?;

    spawn_session_sweeper(state.sessions.clone());

    let address =
        format!("{}:{}", state.config.server.bind_address, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        "quoting portal listening"
    );

    let router = portal::router(state.clone()).merge(health::router(state));
    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(event_name = "system.server.stopping", "quoting portal stopping");

    Ok(())
}

/// Expired sessions are dropped lazily on access; the sweeper keeps abandoned
/// ones from accumulating between requests.
fn spawn_session_sweeper(sessions: SessionStore) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            tick.tick().await;
            let dropped = sessions.purge_expired();
            if dropped > 0 {
                tracing::debug!(
                    event_name = "portal.sessions.purged",
                    dropped,
                    "expired quoting sessions removed"
                );
            }
        }
    });
}

async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
