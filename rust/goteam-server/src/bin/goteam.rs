use anyhow::{Context, Result};
use clap::Parser;
use goteam_server::{AppState, ServerConfig, router};
use goteam_store::MemoryBackend;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::parse();
    let app = AppState::new(&config, MemoryBackend::default())
        .context("invalid server configuration")?;

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!(addr = %config.listen, "GoTeam API listening");

    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown())
        .await
        .context("server error")?;

    info!("GoTeam API stopped");
    Ok(())
}

async fn shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
