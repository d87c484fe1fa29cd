//! Attribution engine: Turns raw explainer output into a ranked explanation.
//!
//! The explainer reports one attribution row per class; this service selects
//! the positive class explicitly and never falls back to another slice.

use crate::domain::{
    AttributionResult, ClassAttributions, FeatureAttributions, FeatureVector, NUM_FEATURES,
};
use crate::ports::{AttributionError, Explainer, RiskModel};

/// Index of the "disease present" class in binary outputs.
pub const POSITIVE_CLASS: usize = 1;

/// Number of classes the engine accepts.
pub const BINARY_CLASSES: usize = 2;

/// Pick the positive-class contributions and expected value.
///
/// # Errors
/// Returns `AttributionError::UnsupportedClassCardinality` unless both the
/// rows and the expected values describe exactly two classes, and
/// `AttributionError::FeatureCountMismatch` / `AttributionError::NonFinite`
/// if the positive row is malformed.
pub fn select_positive_class(
    raw: &ClassAttributions,
) -> Result<(FeatureAttributions, f64), AttributionError> {
    if raw.per_class.len() != BINARY_CLASSES {
        return Err(AttributionError::UnsupportedClassCardinality(
            raw.per_class.len(),
        ));
    }
    if raw.expected_values.len() != BINARY_CLASSES {
        return Err(AttributionError::UnsupportedClassCardinality(
            raw.expected_values.len(),
        ));
    }

    let row = &raw.per_class[POSITIVE_CLASS];
    let values: [f64; NUM_FEATURES] =
        row.as_slice()
            .try_into()
            .map_err(|_| AttributionError::FeatureCountMismatch {
                expected: NUM_FEATURES,
                found: row.len(),
            })?;
    let base_value = raw.expected_values[POSITIVE_CLASS];

    if !base_value.is_finite() || values.iter().any(|v| !v.is_finite()) {
        return Err(AttributionError::NonFinite);
    }
    Ok((FeatureAttributions(values), base_value))
}

/// Explains positive-class probabilities with an injected [`Explainer`].
#[derive(Debug, Clone, Default)]
pub struct AttributionEngine<E> {
    explainer: E,
}

impl<E: Explainer> AttributionEngine<E> {
    pub fn new(explainer: E) -> Self {
        Self { explainer }
    }

    /// Attribute `model`'s positive-class probability for `features`.
    ///
    /// # Errors
    /// Propagates the explainer's error, or the selection errors of
    /// [`select_positive_class`].
    pub fn explain<M: RiskModel + ?Sized>(
        &self,
        model: &M,
        features: &FeatureVector,
    ) -> Result<AttributionResult, AttributionError> {
        let raw = self.explainer.explain(model, features)?;
        let (per_feature, base_value) = select_positive_class(&raw)?;
        Ok(AttributionResult::new(per_feature, base_value))
    }
}
