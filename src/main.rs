mod bot;
mod config;
mod error;
mod gateway;
mod health;
mod replies;
mod router;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,supportbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; missing identifiers keep the process from starting
    let config = Arc::new(Config::from_env().context("Invalid configuration")?);

    info!("Configuration loaded");
    info!("  Support chat: {}", config.support_chat_id);
    info!("  Personal chat: {}", config.personal_chat_id);
    info!("  Health-check port: {}", config.port);

    let shutdown = CancellationToken::new();

    // SIGINT/SIGTERM cancel the token; everything else reacts to that
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            wait_for_signal().await;
            info!("Received stop signal, shutting down...");
            shutdown.cancel();
        }
    });

    let health = tokio::spawn(health::run(config.port, shutdown.clone()));

    bot::run(config, shutdown.clone()).await?;

    // If the dispatcher exited on its own, take the health listener down too
    shutdown.cancel();
    match health.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Health-check listener error: {:#}", e),
        Err(e) => warn!("Health-check task failed: {}", e),
    }

    info!("Bot stopped");
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
