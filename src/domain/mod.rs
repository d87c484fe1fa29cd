//! Domain layer: Core business types and logic.
//!
//! This module contains pure Rust types with no I/O.
//! The feature order defined here is the single positional contract shared
//! by the vector builder, the model artifact and the attribution labels.

mod attribution;
mod patient;
mod prediction;
mod report;
mod risk;
mod tree;

pub use attribution::{AttributionResult, ClassAttributions, FeatureAttributions};
pub use patient::{Feature, FeatureVector, PatientRecord, FEATURE_ORDER, NUM_FEATURES};
pub use prediction::{PredictionRecord, PredictionResponse};
pub use report::{Effect, ReportFactor, ReportRequest, REPORT_TOP_FACTORS};
pub use risk::{round2, PredictionResult, RiskLevel, HIGH_RISK_THRESHOLD, LOW_RISK_THRESHOLD};
pub use tree::{sigmoid, Node, Objective, Tree, TreeEnsemble};

#[cfg(test)]
pub(crate) use patient::fixtures;
#[cfg(test)]
pub(crate) use tree::fixtures as tree_fixtures;
