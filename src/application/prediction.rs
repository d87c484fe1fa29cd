//! Prediction service: Orchestrates the prediction-and-explanation pipeline.
//!
//! This service coordinates:
//! - Feature vector construction
//! - Risk classification
//! - Attribution of the positive-class probability
//! - Best-effort persistence of the prediction log

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{FeatureVector, PatientRecord, PredictionRecord, PredictionResponse, PredictionResult};
use crate::ports::{AttributionError, Explainer, ModelError, PredictionStore, RiskModel};

use super::attribution::AttributionEngine;

/// Default bound on a single persistence attempt.
pub const DEFAULT_PERSIST_TIMEOUT: Duration = Duration::from_millis(2000);

/// Failure of a prediction request.
///
/// Persistence problems never appear here; they are logged and dropped.
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("Inference failed: {0}")]
    Inference(#[from] ModelError),

    #[error("Attribution failed: {0}")]
    Attribution(#[from] AttributionError),
}

/// Service for running predictions.
///
/// The model is loaded once by the caller and shared read-only; the store is
/// optional, and without one the persistence step is skipped.
pub struct PredictionService<M, E, S>
where
    M: RiskModel,
    E: Explainer,
    S: PredictionStore,
{
    model: Arc<M>,
    attribution: AttributionEngine<E>,
    store: Option<Arc<S>>,
    persist_timeout: Duration,
}

impl<M, E, S> PredictionService<M, E, S>
where
    M: RiskModel,
    E: Explainer,
    S: PredictionStore + 'static,
{
    /// Create a new prediction service.
    pub fn new(model: Arc<M>, explainer: E, store: Option<Arc<S>>) -> Self {
        Self {
            model,
            attribution: AttributionEngine::new(explainer),
            store,
            persist_timeout: DEFAULT_PERSIST_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_persist_timeout(mut self, timeout: Duration) -> Self {
        self.persist_timeout = timeout;
        self
    }

    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }

    #[must_use]
    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Probability and risk band for one feature vector.
    ///
    /// # Errors
    /// Returns `ModelError::Inference` if the model fails on the row.
    pub fn classify(&self, features: &FeatureVector) -> Result<PredictionResult, ModelError> {
        let probability = self.model.predict_probability(features)?;
        Ok(PredictionResult::from_probability(probability))
    }

    /// Run the full pipeline for one validated record.
    ///
    /// Classification and attribution both complete before persistence
    /// starts; a failure in either fails the whole request, while a failed or
    /// slow write only produces a log line.
    ///
    /// # Errors
    /// Returns `PredictionError::Inference` or `PredictionError::Attribution`.
    pub async fn handle_prediction(
        &self,
        patient: PatientRecord,
    ) -> Result<PredictionResponse, PredictionError> {
        let features = patient.to_vector();

        let result = self.classify(&features).map_err(|e| {
            tracing::error!(error = %e, "Risk classification failed");
            e
        })?;
        let attribution = self.attribution.explain(&*self.model, &features).map_err(|e| {
            tracing::error!(error = %e, "Attribution failed");
            e
        })?;

        self.persist(PredictionRecord::new(patient, result)).await;

        tracing::info!(
            risk_level = %result.risk_level,
            risk_probability = result.risk_probability,
            "Prediction complete"
        );
        Ok(PredictionResponse::new(result, attribution))
    }

    async fn persist(&self, record: PredictionRecord) {
        let Some(store) = self.store.clone() else {
            tracing::debug!("No prediction store configured, skipping persistence");
            return;
        };

        let write = tokio::task::spawn_blocking(move || store.save_prediction(&record));
        match tokio::time::timeout(self.persist_timeout, write).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => tracing::error!(error = %e, "Failed to persist prediction"),
            Ok(Err(e)) => tracing::error!(error = %e, "Persistence task failed"),
            Err(_) => tracing::error!(
                timeout_ms = self.persist_timeout.as_millis() as u64,
                "Persisting prediction timed out"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ensemble::{TreeEnsembleModel, TreeExplainer};
    use crate::adapters::sqlite::SqliteStore;
    use crate::domain::{fixtures, RiskLevel, NUM_FEATURES};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn bundled_model() -> Arc<TreeEnsembleModel> {
        Arc::new(
            TreeEnsembleModel::from_json(include_bytes!("../../models/heart_model.json"))
                .expect("Bundled model should be valid"),
        )
    }

    #[derive(Debug, thiserror::Error)]
    #[error("store disconnected")]
    struct Disconnected;

    #[derive(Default)]
    struct FailingStore {
        attempts: AtomicUsize,
    }

    impl PredictionStore for FailingStore {
        type Error = Disconnected;

        fn save_prediction(&self, _record: &PredictionRecord) -> Result<(), Self::Error> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(Disconnected)
        }

        fn count_predictions(&self) -> Result<usize, Self::Error> {
            Err(Disconnected)
        }

        fn recent_predictions(&self, _limit: usize) -> Result<Vec<PredictionRecord>, Self::Error> {
            Err(Disconnected)
        }
    }

    struct SlowStore;

    impl PredictionStore for SlowStore {
        type Error = Disconnected;

        fn save_prediction(&self, _record: &PredictionRecord) -> Result<(), Self::Error> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(())
        }

        fn count_predictions(&self) -> Result<usize, Self::Error> {
            Ok(0)
        }

        fn recent_predictions(&self, _limit: usize) -> Result<Vec<PredictionRecord>, Self::Error> {
            Ok(Vec::new())
        }
    }

    struct BrokenModel;

    impl RiskModel for BrokenModel {
        fn predict_proba(&self, _features: &FeatureVector) -> Result<Vec<f64>, ModelError> {
            Err(ModelError::Inference("incompatible feature count".into()))
        }
    }

    /// Valid probabilities but no tree structure to explain.
    struct ConstantModel(f64);

    impl RiskModel for ConstantModel {
        fn predict_proba(&self, _features: &FeatureVector) -> Result<Vec<f64>, ModelError> {
            Ok(vec![1.0 - self.0, self.0])
        }
    }

    #[tokio::test]
    async fn test_prediction_pipeline_persists() {
        let store = Arc::new(SqliteStore::in_memory().expect("Should create db"));
        let service = PredictionService::new(bundled_model(), TreeExplainer::new(), Some(store.clone()));

        let response = service
            .handle_prediction(fixtures::adverse())
            .await
            .expect("Should predict");
        assert_eq!(response.risk_level, RiskLevel::High);
        assert_eq!(response.top_risk_factors.len(), NUM_FEATURES);

        let saved = store.recent_predictions(5).expect("Should load");
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].patient, fixtures::adverse());
        assert_eq!(saved[0].risk_probability, response.risk_probability);
        assert_eq!(saved[0].risk_level, response.risk_level);
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_change_response() {
        let healthy = PredictionService::<_, _, SqliteStore>::new(bundled_model(), TreeExplainer::new(), None);
        let failing_store = Arc::new(FailingStore::default());
        let failing = PredictionService::new(
            bundled_model(),
            TreeExplainer::new(),
            Some(failing_store.clone()),
        );

        let expected = healthy.handle_prediction(fixtures::favorable()).await.unwrap();
        let actual = failing
            .handle_prediction(fixtures::favorable())
            .await
            .expect("Persistence failure must not fail the request");
        assert_eq!(actual, expected);
        assert_eq!(failing_store.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_persistence_is_bounded() {
        let service = PredictionService::new(bundled_model(), TreeExplainer::new(), Some(Arc::new(SlowStore)))
            .with_persist_timeout(Duration::from_millis(20));

        let started = std::time::Instant::now();
        let response = service.handle_prediction(fixtures::favorable()).await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(250));
        assert_eq!(response.risk_level, RiskLevel::Low);
    }

    #[tokio::test]
    async fn test_inference_error_is_reported() {
        let service =
            PredictionService::<_, _, SqliteStore>::new(Arc::new(BrokenModel), TreeExplainer::new(), None);
        let err = service.handle_prediction(fixtures::adverse()).await.unwrap_err();
        assert!(matches!(err, PredictionError::Inference(_)));
    }

    #[tokio::test]
    async fn test_attribution_error_is_distinct() {
        let store = Arc::new(SqliteStore::in_memory().expect("Should create db"));
        let service = PredictionService::new(
            Arc::new(ConstantModel(0.42)),
            TreeExplainer::new(),
            Some(store.clone()),
        );
        let err = service.handle_prediction(fixtures::adverse()).await.unwrap_err();
        assert!(matches!(
            err,
            PredictionError::Attribution(AttributionError::UnsupportedModel)
        ));
        // No partial result reaches the log either.
        assert_eq!(store.count_predictions().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_repeated_calls_are_identical() {
        let store = Arc::new(SqliteStore::in_memory().expect("Should create db"));
        let service = PredictionService::new(bundled_model(), TreeExplainer::new(), Some(store.clone()));

        let first = service.handle_prediction(fixtures::adverse()).await.unwrap();
        let second = service.handle_prediction(fixtures::adverse()).await.unwrap();
        assert_eq!(first, second);
        // Duplicates are logged, not deduplicated.
        assert_eq!(store.count_predictions().unwrap(), 2);
    }

    #[test]
    fn test_classify_thresholds() {
        let classify = |p: f64| {
            PredictionService::<_, _, SqliteStore>::new(Arc::new(ConstantModel(p)), TreeExplainer::new(), None)
                .classify(&fixtures::adverse().to_vector())
                .unwrap()
                .risk_level
        };
        assert_eq!(classify(0.29), RiskLevel::Low);
        assert_eq!(classify(0.3), RiskLevel::Moderate);
        assert_eq!(classify(0.599), RiskLevel::Moderate);
        assert_eq!(classify(0.6), RiskLevel::High);
    }
}
