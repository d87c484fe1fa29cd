//! HTTP server: routing, auth middleware, and error mapping.

mod api;
mod auth;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use auth::API_KEY_HEADER;
pub use error::ApiError;
pub use state::{AppState, Predictor};

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Listener and routing settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty allows any
    pub cors_origins: Vec<String>,
}

/// Serve `state` until ctrl+c.
pub async fn run_server(config: ServerConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    let app = create_router(state, &config.cors_origins);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        address = %addr,
        pid = std::process::id(),
        cors_any = config.cors_origins.is_empty(),
        started_at = %start_time.to_rfc3339(),
        "Server listening and ready to accept connections"
    );

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(
            uptime_secs = uptime.num_seconds(),
            "Shutdown signal received, stopping server gracefully"
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
