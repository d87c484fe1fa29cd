//! Storage port: Trait for persistent storage operations.
//!
//! This trait abstracts the storage backend (SQLite) from the application logic.

use crate::domain::PredictionRecord;

/// Append-only prediction log.
///
/// Writes are best-effort from the caller's point of view: a failure here
/// never changes the response already computed for a client.
pub trait PredictionStore: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Append one prediction record.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn save_prediction(&self, record: &PredictionRecord) -> Result<(), Self::Error>;

    /// Get the total count of stored predictions.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn count_predictions(&self) -> Result<usize, Self::Error>;

    /// Load the most recent predictions (up to `limit`), newest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn recent_predictions(&self, limit: usize) -> Result<Vec<PredictionRecord>, Self::Error>;
}

/// Registry of accepted API keys.
pub trait ApiKeyStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Whether `key` is registered.
    ///
    /// # Errors
    /// Returns error if the lookup itself fails.
    fn has_api_key(&self, key: &str) -> Result<bool, Self::Error>;

    /// Register `key`; registering an existing key is a no-op.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn insert_api_key(&self, key: &str) -> Result<(), Self::Error>;
}
