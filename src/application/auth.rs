//! API key verification for the `/api` routes.
//!
//! Two modes: with a key store attached, a key is accepted iff it is
//! registered; without one, it must equal the configured static key.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::ports::ApiKeyStore;

/// Default key when none is configured.
pub const DEFAULT_API_KEY: &str = "Heart_disease_api";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid API Key")]
    InvalidKey,

    #[error("Key store unavailable: {0}")]
    Unavailable(String),
}

pub struct ApiKeyVerifier<K: ApiKeyStore> {
    static_key: Zeroizing<String>,
    store: Option<Arc<K>>,
}

impl<K: ApiKeyStore> std::fmt::Debug for ApiKeyVerifier<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyVerifier")
            .field("static_key", &"[REDACTED]")
            .field("store", &self.store.is_some())
            .finish()
    }
}

impl<K: ApiKeyStore> ApiKeyVerifier<K> {
    pub fn new(static_key: impl Into<String>, store: Option<Arc<K>>) -> Self {
        Self {
            static_key: Zeroizing::new(static_key.into()),
            store,
        }
    }

    #[must_use]
    pub fn uses_store(&self) -> bool {
        self.store.is_some()
    }

    /// Register the configured key in the store, if any.
    ///
    /// # Errors
    /// Returns `AuthError::Unavailable` if the insert fails.
    pub fn seed(&self) -> Result<(), AuthError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        store
            .insert_api_key(&self.static_key)
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;
        tracing::info!("API key registered in key store");
        Ok(())
    }

    /// Check a presented key.
    ///
    /// # Errors
    /// `AuthError::InvalidKey` for a missing or unknown key,
    /// `AuthError::Unavailable` if the store lookup fails.
    pub fn verify(&self, presented: Option<&str>) -> Result<(), AuthError> {
        let Some(presented) = presented.filter(|k| !k.is_empty()) else {
            return Err(AuthError::InvalidKey);
        };

        let accepted = match &self.store {
            Some(store) => store.has_api_key(presented).map_err(|e| {
                tracing::error!(error = %e, "API key lookup failed");
                AuthError::Unavailable(e.to_string())
            })?,
            None => digest_eq(presented, &self.static_key),
        };

        if accepted {
            Ok(())
        } else {
            tracing::warn!("Rejected request with invalid API key");
            Err(AuthError::InvalidKey)
        }
    }
}

/// Compare fixed-size digests so timing is independent of the inputs.
fn digest_eq(a: &str, b: &str) -> bool {
    let da = Sha256::digest(a.as_bytes());
    let db = Sha256::digest(b.as_bytes());
    da.iter().zip(db.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
