use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use drivermanager::config::{AppConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use drivermanager::domain::spawn_job;
use drivermanager::{initialize_backend, rest};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = AppConfig::load_or_default(&config_path);

    let state = initialize_backend(&config).await?;

    // Daily expiry check
    let _expiry_job = spawn_job(state.scheduler.clone())?;

    let app = rest::create_router(state, &config.server.allowed_origin);

    let addr: SocketAddr = config
        .server
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.server.bind_address))?;
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
