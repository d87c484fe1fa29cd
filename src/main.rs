//! HeartGuard: heart disease risk prediction API
//!
//! Main entry point for the HTTP server.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use heartguard::adapters::sanitize::SanitizingMakeWriter;
use heartguard::config::AppConfig;
use heartguard::server::{run_server, AppState, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stdout unless HEARTGUARD_LOG_MODE=file, so `docker logs` works
    // by default.
    let use_file = std::env::var("HEARTGUARD_LOG_MODE").is_ok_and(|mode| mode == "file");

    let (writer, _guard) = if use_file {
        let log_file = std::env::var("HEARTGUARD_LOG_FILE")
            .unwrap_or_else(|_| "/app/data/heartguard.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("Failed to open log file {log_file}"))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    let config = AppConfig::parse();
    tracing::info!(
        model_path = %config.model_path.display(),
        require_signed_model = config.require_signed_model,
        "Starting HeartGuard..."
    );

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Model unavailable, refusing to start");
            return Err(e).context("Startup failed");
        }
    };

    let server_config = ServerConfig {
        host: config.host.clone(),
        port: config.port,
        cors_origins: config.cors_origin_list(),
    };
    run_server(server_config, Arc::new(state)).await?;

    tracing::info!("HeartGuard shutdown complete.");
    Ok(())
}
