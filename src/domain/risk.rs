//! Risk classification types.
//!
//! Represents the classifier output after thresholding.

use serde::{Deserialize, Serialize};

/// Probabilities below this are [`RiskLevel::Low`].
pub const LOW_RISK_THRESHOLD: f64 = 0.3;

/// Probabilities at or above this are [`RiskLevel::High`].
pub const HIGH_RISK_THRESHOLD: f64 = 0.6;

/// Risk level classification for heart disease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Low risk of heart disease
    Low,
    /// Moderate risk, monitoring recommended
    Moderate,
    /// High risk, intervention recommended
    High,
}

impl RiskLevel {
    /// Bucket a probability using half-open intervals:
    /// `[0, 0.3)` Low, `[0.3, 0.6)` Moderate, `[0.6, 1]` High.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability < LOW_RISK_THRESHOLD {
            Self::Low
        } else if probability < HIGH_RISK_THRESHOLD {
            Self::Moderate
        } else {
            Self::High
        }
    }

    /// Wire name, as returned by the API and stored with predictions.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
        }
    }

    /// Parse a wire name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Low" => Some(Self::Low),
            "Moderate" => Some(Self::Moderate),
            "High" => Some(Self::High),
            _ => None,
        }
    }

    /// Report color (RGB).
    #[must_use]
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Self::Low => (0x27, 0xae, 0x60),      // #27ae60
            Self::Moderate => (0xf3, 0x9c, 0x12), // #f39c12
            Self::High => (0xe7, 0x4c, 0x3c),     // #e74c3c
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output for a single patient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Positive-class probability, rounded to 2 decimals
    pub risk_probability: f64,

    /// Risk band derived from the unrounded probability
    pub risk_level: RiskLevel,
}

impl PredictionResult {
    /// Classify a raw positive-class probability.
    ///
    /// The level is decided on the exact probability; only the reported
    /// value is rounded.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        Self {
            risk_probability: round2(probability),
            risk_level: RiskLevel::from_probability(probability),
        }
    }
}

/// Round to two decimal places for display.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
