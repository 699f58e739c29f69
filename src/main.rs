use std::sync::Arc;

use tokio::time::Duration;
use tracing_subscriber::EnvFilter;

use field_dispatch::api;
use field_dispatch::config::Config;
use field_dispatch::engine::expiry::run_offer_expiry;
use field_dispatch::error::AppError;
use field_dispatch::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let http_port = config.http_port;
    let sweep_every = Duration::from_secs(config.offer_sweep_interval_secs.max(1));
    let shared_state = Arc::new(AppState::new(config));

    let app = api::rest::router(shared_state.clone());

    tokio::spawn(run_offer_expiry(shared_state.clone(), sweep_every));

    let bind_addr = format!("0.0.0.0:{http_port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}
