//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (model artifact, attribution
//! method, storage).

mod explainer;
mod model;
mod storage;

pub use explainer::{AttributionError, Explainer};
pub use model::{ModelError, RiskModel};
pub use storage::{ApiKeyStore, PredictionStore};
