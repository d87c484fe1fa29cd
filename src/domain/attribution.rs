//! Per-feature attribution types.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::patient::{Feature, FEATURE_ORDER, NUM_FEATURES};

/// Signed contribution of every feature, indexed by [`FEATURE_ORDER`].
///
/// Serializes as a JSON object keyed by feature name, in feature order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureAttributions(pub [f64; NUM_FEATURES]);

impl FeatureAttributions {
    #[must_use]
    pub fn get(&self, feature: Feature) -> f64 {
        self.0[feature.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        FEATURE_ORDER.iter().copied().zip(self.0.iter().copied())
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Features ordered by descending absolute contribution.
    ///
    /// The sort is stable over [`FEATURE_ORDER`], so equal magnitudes keep
    /// their canonical relative order.
    #[must_use]
    pub fn ranked(&self) -> Vec<Feature> {
        let mut ranked = FEATURE_ORDER.to_vec();
        ranked.sort_by(|a, b| self.get(*b).abs().total_cmp(&self.get(*a).abs()));
        ranked
    }
}

impl Serialize for FeatureAttributions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(NUM_FEATURES))?;
        for (feature, value) in self.iter() {
            map.serialize_entry(feature.name(), &value)?;
        }
        map.end()
    }
}

/// Explanation of a single positive-class probability.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributionResult {
    /// Signed contribution per feature (positive pushes toward disease)
    pub per_feature: FeatureAttributions,

    /// All features, most to least impactful
    pub ranked_features: Vec<Feature>,

    /// Expected model output absent any evidence
    pub base_value: f64,
}

impl AttributionResult {
    #[must_use]
    pub fn new(per_feature: FeatureAttributions, base_value: f64) -> Self {
        Self {
            ranked_features: per_feature.ranked(),
            per_feature,
            base_value,
        }
    }

    /// `base_value + Σ contributions`; equals the explained probability.
    #[must_use]
    pub fn reconstructed_output(&self) -> f64 {
        self.base_value + self.per_feature.sum()
    }

    /// The `k` most impactful features.
    #[must_use]
    pub fn top(&self, k: usize) -> &[Feature] {
        &self.ranked_features[..k.min(self.ranked_features.len())]
    }
}

/// Raw explainer output: one attribution row and one expected value per class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassAttributions {
    pub per_class: Vec<Vec<f64>>,
    pub expected_values: Vec<f64>,
}
