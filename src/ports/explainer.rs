//! Explainer port: Trait for additive feature-attribution methods.

use crate::domain::{ClassAttributions, FeatureVector};
use crate::ports::RiskModel;

/// Errors raised while computing attributions.
///
/// Kept apart from [`crate::ports::ModelError`]: an attribution failure
/// points at an integration defect, not at the input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttributionError {
    #[error("Model type not supported by the attribution method")]
    UnsupportedModel,

    #[error("Expected attributions for 2 classes, got {0}")]
    UnsupportedClassCardinality(usize),

    #[error("Expected {expected} feature attributions, got {found}")]
    FeatureCountMismatch { expected: usize, found: usize },

    #[error("Attribution produced a non-finite value")]
    NonFinite,

    #[error("Attribution failed: {0}")]
    Computation(String),
}

/// An additive feature-attribution method.
///
/// Implementations return one row per class plus the matching expected
/// values; the caller selects the class it explains.
pub trait Explainer: Send + Sync {
    /// Attribute the model output for `features`.
    ///
    /// # Errors
    /// Returns `AttributionError::UnsupportedModel` if `model` lacks the
    /// structure this method needs.
    fn explain<M: RiskModel + ?Sized>(
        &self,
        model: &M,
        features: &FeatureVector,
    ) -> Result<ClassAttributions, AttributionError>;
}
