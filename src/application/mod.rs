//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases of the application.

mod attribution;
mod auth;
mod prediction;
mod report;

pub use attribution::{select_positive_class, AttributionEngine, BINARY_CLASSES, POSITIVE_CLASS};
pub use auth::{ApiKeyVerifier, AuthError, DEFAULT_API_KEY};
pub use prediction::{PredictionError, PredictionService, DEFAULT_PERSIST_TIMEOUT};
pub use report::{ReportService, REPORT_FILENAME};
