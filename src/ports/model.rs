//! Risk model port: Trait for the trained probabilistic classifier.
//!
//! This trait abstracts the serialized model family from the application
//! logic, so the orchestrator can be exercised with a substitute model.

use crate::domain::{FeatureVector, TreeEnsemble};

/// Errors raised while loading or evaluating the trained model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model artifact unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("Model feature order {found:?} does not match the expected order")]
    FeatureOrderMismatch { found: Vec<String> },

    #[error("Model integrity check failed: {0}")]
    Integrity(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// A trained binary classifier, read-only after load.
///
/// Implementations must be safe to share across concurrent requests.
pub trait RiskModel: Send + Sync {
    /// Class probabilities for a single row, indexed by class.
    ///
    /// Binary models return `[p(no disease), p(disease)]`.
    ///
    /// # Errors
    /// Returns `ModelError::Inference` if the model cannot evaluate the row.
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, ModelError>;

    /// Positive-class (index 1) probability.
    ///
    /// # Errors
    /// Returns `ModelError::Inference` if the model is not binary or yields
    /// a value outside `[0, 1]`.
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let proba = self.predict_proba(features)?;
        if proba.len() != 2 {
            return Err(ModelError::Inference(format!(
                "expected 2 class probabilities, got {}",
                proba.len()
            )));
        }
        let p = proba[1];
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(ModelError::Inference(format!(
                "positive-class probability {p} outside [0, 1]"
            )));
        }
        Ok(p)
    }

    /// Tree structure, for models that expose one to tree attribution.
    fn tree_ensemble(&self) -> Option<&TreeEnsemble> {
        None
    }
}
