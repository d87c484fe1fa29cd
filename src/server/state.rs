//! Application state management

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::adapters::ensemble::{TreeEnsembleModel, TreeExplainer};
use crate::adapters::sqlite::SqliteStore;
use crate::adapters::StorageError;
use crate::application::{
    ApiKeyVerifier, PredictionService, ReportService, DEFAULT_PERSIST_TIMEOUT,
};
use crate::config::AppConfig;

pub type Predictor = PredictionService<TreeEnsembleModel, TreeExplainer, SqliteStore>;

/// Application state shared across handlers
pub struct AppState {
    pub predictor: Predictor,
    pub reports: ReportService,
    pub verifier: ApiKeyVerifier<SqliteStore>,
}

impl AppState {
    pub fn new(predictor: Predictor, verifier: ApiKeyVerifier<SqliteStore>) -> Self {
        Self {
            predictor,
            reports: ReportService::new(),
            verifier,
        }
    }

    /// Wire a loaded model and an optional store into a ready state.
    ///
    /// The same store backs the prediction log and the API key registry.
    pub fn build(
        model: Arc<TreeEnsembleModel>,
        store: Option<Arc<SqliteStore>>,
        api_key: &str,
    ) -> Self {
        Self::with_persist_timeout(model, store, api_key, DEFAULT_PERSIST_TIMEOUT)
    }

    fn with_persist_timeout(
        model: Arc<TreeEnsembleModel>,
        store: Option<Arc<SqliteStore>>,
        api_key: &str,
        persist_timeout: Duration,
    ) -> Self {
        let predictor = PredictionService::new(model, TreeExplainer::new(), store.clone())
            .with_persist_timeout(persist_timeout);
        Self::new(predictor, ApiKeyVerifier::new(api_key, store))
    }

    /// Load the model and open the store described by `config`.
    ///
    /// A model that fails to load or verify is fatal. A store that fails to
    /// open is logged and the service runs without persistence, with API
    /// keys checked against the configured static key.
    ///
    /// # Errors
    /// Returns `HeartguardError::Model` if the model is unavailable.
    pub fn from_config(config: &AppConfig) -> crate::Result<Self> {
        let model = TreeEnsembleModel::load(&config.model_path, &config.integrity_policy())?;

        let store = match config.database_path.as_deref().map(open_store).transpose() {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(error = %e, "Database unavailable, running without persistence");
                None
            }
        };
        info!(
            database_configured = store.is_some(),
            api_key_configured = !config.api_key.is_empty(),
            "Storage and authentication initialised"
        );

        let state = Self::with_persist_timeout(
            Arc::new(model),
            store,
            &config.api_key,
            config.persist_timeout(),
        );
        if let Err(e) = state.verifier.seed() {
            tracing::warn!(error = %e, "Failed to register API key in key store");
        }
        Ok(state)
    }
}

fn open_store(path: &Path) -> crate::Result<Arc<SqliteStore>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
    }
    Ok(Arc::new(SqliteStore::new(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    fn config(args: &[&str]) -> AppConfig {
        AppConfig::try_parse_from(std::iter::once("heartguard").chain(args.iter().copied()))
            .expect("Should parse")
    }

    fn bundled_model_path() -> String {
        format!("{}/models/heart_model.json", env!("CARGO_MANIFEST_DIR"))
    }

    #[test]
    fn test_missing_model_is_fatal() {
        let err = AppState::from_config(&config(&["--model-path", "/nonexistent/model.json"]))
            .err()
            .expect("Should fail");
        assert!(matches!(err, crate::HeartguardError::Model(_)));
    }

    #[test]
    fn test_database_seeded_with_api_key() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("nested/heartguard.db");
        let model = bundled_model_path();
        let state = AppState::from_config(&config(&[
            "--model-path",
            &model,
            "--database-path",
            db.to_str().unwrap(),
            "--api-key",
            "seeded-key-1",
        ]))
        .expect("Should start");

        assert!(state.predictor.has_store());
        assert!(state.verifier.uses_store());
        assert!(state.verifier.verify(Some("seeded-key-1")).is_ok());
        assert!(db.exists());
    }

    #[test]
    fn test_unopenable_database_degrades() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let db = blocker.join("heartguard.db");
        let model = bundled_model_path();
        let state = AppState::from_config(&config(&[
            "--model-path",
            &model,
            "--database-path",
            db.to_str().unwrap(),
        ]))
        .expect("Should start without persistence");

        assert!(!state.predictor.has_store());
        assert!(!state.verifier.uses_store());
    }
}
