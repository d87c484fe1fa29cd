//! Report request: a finished prediction echoed back for rendering.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::patient::{Feature, PatientRecord};
use super::risk::RiskLevel;

/// Factors shown in the report, most impactful first.
pub const REPORT_TOP_FACTORS: usize = 5;

/// Body of a report request: the patient inputs plus a prediction response.
///
/// Fields arrive from the client unverified, so unknown feature names and
/// risk levels are tolerated and rendered as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    #[serde(flatten)]
    pub patient: PatientRecord,
    pub risk_probability: f64,
    pub risk_level: String,
    pub shap_values: HashMap<String, f64>,
    pub top_risk_factors: Vec<String>,
    pub base_value: f64,
}

/// Direction in which a factor moved the prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Increasing,
    Decreasing,
}

impl Effect {
    /// Zero counts as increasing.
    #[must_use]
    pub fn from_contribution(value: f64) -> Self {
        if value >= 0.0 {
            Self::Increasing
        } else {
            Self::Decreasing
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
        }
    }
}

/// One line of the "top risk factors" section.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportFactor {
    pub label: String,
    pub interpretation: &'static str,
    pub effect: Effect,
}

impl ReportRequest {
    /// Parsed risk level, `None` for unrecognised strings.
    #[must_use]
    pub fn risk_level(&self) -> Option<RiskLevel> {
        RiskLevel::parse(&self.risk_level)
    }

    /// The first [`REPORT_TOP_FACTORS`] ranked factors.
    ///
    /// Unknown names keep the raw name as label and have no interpretation;
    /// a factor missing from `shap_values` counts as a zero contribution.
    #[must_use]
    pub fn top_factors(&self) -> Vec<ReportFactor> {
        self.top_risk_factors
            .iter()
            .take(REPORT_TOP_FACTORS)
            .map(|name| {
                let contribution = self.shap_values.get(name).copied().unwrap_or(0.0);
                let feature = Feature::from_name(name);
                ReportFactor {
                    label: feature.map_or_else(|| name.clone(), |f| f.label().to_string()),
                    interpretation: feature.map_or("", Feature::interpretation),
                    effect: Effect::from_contribution(contribution),
                }
            })
            .collect()
    }
}
