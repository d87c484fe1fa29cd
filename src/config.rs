//! Process configuration, read from flags with environment fallbacks.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::adapters::ensemble::IntegrityPolicy;
use crate::application::DEFAULT_API_KEY;

#[derive(Debug, Clone, Parser)]
#[command(name = "heartguard", version, about = "Heart disease risk prediction API")]
pub struct AppConfig {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Tree-ensemble artifact loaded at startup
    #[arg(long, env = "MODEL_PATH", default_value = "models/heart_model.json")]
    pub model_path: PathBuf,

    /// SQLite database for the prediction log and API keys
    #[arg(long, env = "DATABASE_PATH")]
    pub database_path: Option<PathBuf>,

    #[arg(long, env = "API_KEY", default_value = DEFAULT_API_KEY, hide_env_values = true)]
    pub api_key: String,

    /// Comma-separated allowed origins, `*` for any
    #[arg(long, env = "CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Upper bound on one prediction-log write
    #[arg(long, env = "PERSIST_TIMEOUT_MS", default_value_t = 2000)]
    pub persist_timeout_ms: u64,

    /// Refuse to start unless the model carries a valid signature
    #[arg(long, env = "REQUIRE_SIGNED_MODEL", default_value_t = false)]
    pub require_signed_model: bool,

    /// Base64 Ed25519 verifying key for signed models
    #[arg(long, env = "MODEL_PUBKEY_FILE")]
    pub model_pubkey_file: Option<PathBuf>,
}

impl AppConfig {
    #[must_use]
    pub fn persist_timeout(&self) -> Duration {
        Duration::from_millis(self.persist_timeout_ms)
    }

    #[must_use]
    pub fn integrity_policy(&self) -> IntegrityPolicy {
        IntegrityPolicy {
            require_signature: self.require_signed_model,
            public_key_file: self.model_pubkey_file.clone(),
        }
    }

    /// Parsed origin list; empty means any origin.
    #[must_use]
    pub fn cors_origin_list(&self) -> Vec<String> {
        let origins: Vec<String> = self
            .cors_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();
        if origins.iter().any(|o| o == "*") {
            Vec::new()
        } else {
            origins
        }
    }
}
