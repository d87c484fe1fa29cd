//! # HeartGuard
//!
//! Heart disease risk prediction API with per-feature explanations.
//!
//! This crate provides:
//! - Tree-ensemble inference over 13 clinical features
//! - Exact TreeSHAP attributions for the positive class
//! - Best-effort prediction logging and API key checks backed by SQLite
//! - A PDF assessment report
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core business types (patient record, risk bands, tree ensembles)
//! - `ports`: Trait definitions for external operations
//! - `adapters`: Concrete implementations (JSON ensembles, SQLite, PDF, log redaction)
//! - `application`: Use cases orchestrating domain and ports
//! - `server`: axum HTTP surface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod server;

pub use domain::{PatientRecord, PredictionResponse, RiskLevel};

/// Result type for HeartGuard operations
pub type Result<T> = std::result::Result<T, HeartguardError>;

/// Main error type for HeartGuard
#[derive(Debug, thiserror::Error)]
pub enum HeartguardError {
    #[error("Model unavailable: {0}")]
    Model(#[from] ports::ModelError),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] adapters::StorageError),
}
