//! Prediction response and persisted record.

use serde::{Deserialize, Serialize};

use super::attribution::{AttributionResult, FeatureAttributions};
use super::patient::{Feature, PatientRecord};
use super::risk::{PredictionResult, RiskLevel};

/// Response body of a prediction: the classifier result merged with its
/// explanation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResponse {
    pub risk_probability: f64,
    pub risk_level: RiskLevel,
    pub shap_values: FeatureAttributions,
    #[serde(serialize_with = "serialize_feature_names")]
    pub top_risk_factors: Vec<Feature>,
    pub base_value: f64,
}

impl PredictionResponse {
    #[must_use]
    pub fn new(result: PredictionResult, attribution: AttributionResult) -> Self {
        Self {
            risk_probability: result.risk_probability,
            risk_level: result.risk_level,
            shap_values: attribution.per_feature,
            top_risk_factors: attribution.ranked_features,
            base_value: attribution.base_value,
        }
    }

    #[must_use]
    pub fn result(&self) -> PredictionResult {
        PredictionResult {
            risk_probability: self.risk_probability,
            risk_level: self.risk_level,
        }
    }
}

fn serialize_feature_names<S>(features: &[Feature], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(features.iter().map(|f| f.name()))
}

/// Append-only log entry written after each prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    #[serde(flatten)]
    pub patient: PatientRecord,
    pub risk_probability: f64,
    pub risk_level: RiskLevel,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl PredictionRecord {
    #[must_use]
    pub fn new(patient: PatientRecord, result: PredictionResult) -> Self {
        Self {
            patient,
            risk_probability: result.risk_probability,
            risk_level: result.risk_level,
            created_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::patient::{fixtures, NUM_FEATURES};

    #[test]
    fn test_response_shape() {
        let mut values = [0.0; NUM_FEATURES];
        values[Feature::MajorVessels.index()] = 0.2;
        let attribution = AttributionResult::new(FeatureAttributions(values), 0.45);
        let response =
            PredictionResponse::new(PredictionResult::from_probability(0.654), attribution);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["risk_probability"], 0.65);
        assert_eq!(json["risk_level"], "High");
        assert_eq!(json["shap_values"].as_object().unwrap().len(), NUM_FEATURES);
        assert_eq!(json["top_risk_factors"][0], "ca");
        assert_eq!(json["top_risk_factors"].as_array().unwrap().len(), NUM_FEATURES);
        assert_eq!(json["base_value"], 0.45);
    }

    #[test]
    fn test_record_flattens_patient_fields() {
        let record = PredictionRecord::new(
            fixtures::adverse(),
            PredictionResult::from_probability(0.81),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["age"], 65);
        assert_eq!(json["oldpeak"], 3.5);
        assert_eq!(json["risk_level"], "High");
        assert_eq!(json["risk_probability"], 0.81);
    }
}
