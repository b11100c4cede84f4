use anyhow::{Context, Result};
use clap::Parser;
use doc_hub::api::{self, AppState};
use doc_hub::config::Config;
use doc_hub_core::spawn_flusher;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    let state = AppState::open(&config)
        .with_context(|| format!("failed to open data directory {}", config.data_dir.display()))?;

    let flusher = config
        .flush_period()
        .map(|period| spawn_flusher(state.metadata.clone(), period));

    let listener = TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    info!(addr = %config.addr, "listening");
    let mut app = api::router(state.clone());
    if let Some(dir) = &config.static_dir {
        info!(dir = %dir.display(), "serving frontend");
        app = api::with_frontend(app, dir);
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match flusher {
        Some(flusher) => flusher.stop().await?,
        None => {
            state.metadata.flush()?;
        }
    }
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
