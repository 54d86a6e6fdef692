//! # trustcred-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the public verification API.
//! Binds to `0.0.0.0:$PORT` (default 3001).

use std::net::SocketAddr;

use trustcred_api::config::AppConfig;
use trustcred_api::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    // Initialize structured tracing.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if config.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        environment = config.environment.as_str(),
        fallback = ?config.fallback,
        "starting TrustCred verification API"
    );

    let port = config.port;
    let state = AppState::connect(config).await.map_err(|e| {
        tracing::error!("Startup failed: {e}");
        e
    })?;

    let app = trustcred_api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("TrustCred API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install shutdown handler: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}
