//! Patient input types for cardiovascular risk prediction.
//!
//! Based on the UCI heart disease feature set (13 clinical attributes).

use serde::{Deserialize, Serialize};

/// Number of model input features.
pub const NUM_FEATURES: usize = 13;

/// A single model input feature.
///
/// The declaration order is the canonical feature order: the vector builder,
/// the trained artifact and the attribution labels all index by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    Age,
    Sex,
    ChestPainType,
    RestingBloodPressure,
    Cholesterol,
    FastingBloodSugar,
    RestingEcg,
    MaxHeartRate,
    ExerciseAngina,
    StDepression,
    StSlope,
    MajorVessels,
    Thalassemia,
}

/// Canonical feature order shared by vector building and attribution labeling.
pub const FEATURE_ORDER: [Feature; NUM_FEATURES] = [
    Feature::Age,
    Feature::Sex,
    Feature::ChestPainType,
    Feature::RestingBloodPressure,
    Feature::Cholesterol,
    Feature::FastingBloodSugar,
    Feature::RestingEcg,
    Feature::MaxHeartRate,
    Feature::ExerciseAngina,
    Feature::StDepression,
    Feature::StSlope,
    Feature::MajorVessels,
    Feature::Thalassemia,
];

impl Feature {
    /// Wire name, as used in request bodies, the model artifact and responses.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Sex => "sex",
            Self::ChestPainType => "cp",
            Self::RestingBloodPressure => "trestbps",
            Self::Cholesterol => "chol",
            Self::FastingBloodSugar => "fbs",
            Self::RestingEcg => "restecg",
            Self::MaxHeartRate => "thalach",
            Self::ExerciseAngina => "exang",
            Self::StDepression => "oldpeak",
            Self::StSlope => "slope",
            Self::MajorVessels => "ca",
            Self::Thalassemia => "thal",
        }
    }

    /// Human-readable label for reports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Age => "Your Age",
            Self::Sex => "Sex",
            Self::ChestPainType => "Chest Pain Type",
            Self::RestingBloodPressure => "Resting Blood Pressure",
            Self::Cholesterol => "Cholesterol Level",
            Self::FastingBloodSugar => "Fasting Blood Sugar",
            Self::RestingEcg => "Resting ECG",
            Self::MaxHeartRate => "Maximum Heart Rate",
            Self::ExerciseAngina => "Exercise Induced Angina",
            Self::StDepression => "ST Depression",
            Self::StSlope => "ST Segment Slope",
            Self::MajorVessels => "Major Vessels",
            Self::Thalassemia => "Thalassemia",
        }
    }

    /// Short label for the patient input summary.
    #[must_use]
    pub fn summary_label(self) -> &'static str {
        match self {
            Self::Age => "Age",
            Self::Sex => "Sex",
            Self::ChestPainType => "Chest Pain Type",
            Self::RestingBloodPressure => "Resting BP",
            Self::Cholesterol => "Cholesterol",
            Self::FastingBloodSugar => "Fasting Blood Sugar",
            Self::RestingEcg => "Resting ECG",
            Self::MaxHeartRate => "Max Heart Rate",
            Self::ExerciseAngina => "Exercise Angina",
            Self::StDepression => "ST Depression",
            Self::StSlope => "ST Slope",
            Self::MajorVessels => "Major Vessels",
            Self::Thalassemia => "Thalassemia",
        }
    }

    /// Clinical interpretation of a risk-increasing value.
    #[must_use]
    pub fn interpretation(self) -> &'static str {
        match self {
            Self::Age => "Older age increases risk.",
            Self::Sex => "Male sex increases risk.",
            Self::ChestPainType => "Certain chest pain types increase risk.",
            Self::RestingBloodPressure => "Higher resting blood pressure increases risk.",
            Self::Cholesterol => "Higher cholesterol increases risk.",
            Self::FastingBloodSugar => "High fasting blood sugar increases risk.",
            Self::RestingEcg => "Abnormal ECG increases risk.",
            Self::MaxHeartRate => "Lower maximum heart rate increases risk.",
            Self::ExerciseAngina => "Exercise-induced angina increases risk.",
            Self::StDepression => "Greater ST depression increases risk.",
            Self::StSlope => "Flat or downsloping ST segment increases risk.",
            Self::MajorVessels => "More major vessels increases risk.",
            Self::Thalassemia => "Certain thalassemia types increase risk.",
        }
    }

    /// Position in [`FEATURE_ORDER`].
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up a feature by its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        FEATURE_ORDER.iter().copied().find(|f| f.name() == name)
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Validated clinical input for a single prediction.
///
/// Integral fields are encoded categories or measurements; only the ST
/// depression is continuous.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Age in years (1-150)
    pub age: i64,
    /// 0 = female, 1 = male
    pub sex: i64,
    /// Chest pain type (0-3)
    pub cp: i64,
    /// Resting blood pressure in mmHg (50-300)
    pub trestbps: i64,
    /// Serum cholesterol in mg/dl (100-600)
    pub chol: i64,
    /// Fasting blood sugar > 120 mg/dl (0 or 1)
    pub fbs: i64,
    /// Resting ECG result (0-2)
    pub restecg: i64,
    /// Maximum heart rate achieved (60-250)
    pub thalach: i64,
    /// Exercise induced angina (0 or 1)
    pub exang: i64,
    /// ST depression induced by exercise (0.0-10.0)
    pub oldpeak: f64,
    /// Slope of the peak exercise ST segment (0-2)
    pub slope: i64,
    /// Number of major vessels colored by fluoroscopy (0-3)
    pub ca: i64,
    /// Thalassemia (1-3)
    pub thal: i64,
}

impl PatientRecord {
    /// Raw value of a single feature.
    #[must_use]
    pub fn value(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Age => self.age as f64,
            Feature::Sex => self.sex as f64,
            Feature::ChestPainType => self.cp as f64,
            Feature::RestingBloodPressure => self.trestbps as f64,
            Feature::Cholesterol => self.chol as f64,
            Feature::FastingBloodSugar => self.fbs as f64,
            Feature::RestingEcg => self.restecg as f64,
            Feature::MaxHeartRate => self.thalach as f64,
            Feature::ExerciseAngina => self.exang as f64,
            Feature::StDepression => self.oldpeak,
            Feature::StSlope => self.slope as f64,
            Feature::MajorVessels => self.ca as f64,
            Feature::Thalassemia => self.thal as f64,
        }
    }

    /// Build the model input vector in [`FEATURE_ORDER`].
    #[must_use]
    pub fn to_vector(&self) -> FeatureVector {
        FeatureVector(FEATURE_ORDER.map(|f| self.value(f)))
    }

    /// Validate that all features are within the accepted ranges.
    ///
    /// # Errors
    /// Returns every violation found, one message per field.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let integral: [(&str, i64, i64, i64); 12] = [
            ("age", self.age, 1, 150),
            ("sex", self.sex, 0, 1),
            ("cp", self.cp, 0, 3),
            ("trestbps", self.trestbps, 50, 300),
            ("chol", self.chol, 100, 600),
            ("fbs", self.fbs, 0, 1),
            ("restecg", self.restecg, 0, 2),
            ("thalach", self.thalach, 60, 250),
            ("exang", self.exang, 0, 1),
            ("slope", self.slope, 0, 2),
            ("ca", self.ca, 0, 3),
            ("thal", self.thal, 1, 3),
        ];

        let mut errors: Vec<String> = integral
            .iter()
            .filter(|(_, value, lo, hi)| !(*lo..=*hi).contains(value))
            .map(|(name, value, lo, hi)| format!("{name} {value} out of range [{lo}, {hi}]"))
            .collect();

        if !self.oldpeak.is_finite() || !(0.0..=10.0).contains(&self.oldpeak) {
            errors.push(format!("oldpeak {} out of range [0.0, 10.0]", self.oldpeak));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Model input: the 13 feature values in [`FEATURE_ORDER`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; NUM_FEATURES]);

impl FeatureVector {
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn get(&self, feature: Feature) -> f64 {
        self.0[feature.index()]
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{adverse, favorable};
    use super::*;

    #[test]
    fn test_vector_follows_feature_order() {
        let record = adverse();
        let vector = record.to_vector();

        assert_eq!(
            vector.0,
            [65.0, 1.0, 3.0, 160.0, 280.0, 1.0, 2.0, 120.0, 1.0, 3.5, 2.0, 2.0, 3.0]
        );
        for feature in FEATURE_ORDER {
            assert_eq!(vector.get(feature), record.value(feature));
        }
    }

    #[test]
    fn test_feature_names_round_trip() {
        let names: Vec<&str> = FEATURE_ORDER.iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            [
                "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang",
                "oldpeak", "slope", "ca", "thal"
            ]
        );
        for (i, feature) in FEATURE_ORDER.iter().enumerate() {
            assert_eq!(feature.index(), i);
            assert_eq!(Feature::from_name(feature.name()), Some(*feature));
        }
        assert_eq!(Feature::from_name("bmi"), None);
    }

    #[test]
    fn test_validation() {
        assert!(adverse().validate().is_ok());
        assert!(favorable().validate().is_ok());

        let invalid = PatientRecord {
            age: 0,
            thal: 0,
            oldpeak: 10.5,
            ..favorable()
        };
        let errors = invalid.validate().expect_err("must reject");
        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("age"));
        assert!(errors.iter().any(|e| e.starts_with("oldpeak")));
    }

    #[test]
    fn test_validation_rejects_nan_oldpeak() {
        let invalid = PatientRecord {
            oldpeak: f64::NAN,
            ..favorable()
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_deserialize_rejects_missing_field() {
        let json = r#"{"age":50,"sex":1,"cp":0,"trestbps":120,"chol":200,"fbs":0,
            "restecg":0,"thalach":150,"exang":0,"oldpeak":1.0,"slope":1,"ca":0}"#;
        assert!(serde_json::from_str::<PatientRecord>(json).is_err());
    }
}
