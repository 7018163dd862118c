use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Minimal HTTP listener so the hosting platform's port-binding health
/// check passes. Independent of the relay; shares no state with it.
pub async fn run(port: u16, shutdown: CancellationToken) -> Result<()> {
    let app = Router::new().route("/", get(|| async { "Bot is running" }));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind health-check listener on {addr}"))?;

    info!("Health-check listener on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .context("Health-check listener failed")?;

    info!("Health-check listener stopped");
    Ok(())
}
