//! SQLite adapter: Implementation of PredictionStore and ApiKeyStore.
//!
//! Provides the append-only prediction log and the API key registry.
//!
//! # Security
//!
//! API keys are stored as SHA-256 digests, never in clear.
//!
//! # Mutex Behavior
//!
//! The connection is protected by a `Mutex`. A poisoned mutex surfaces as
//! `StorageError::LockPoisoned`; callers treat it like any other store
//! failure.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection};

use crate::adapters::ensemble::sha256_hex;
use crate::domain::{PatientRecord, PredictionRecord, RiskLevel};
use crate::ports::{ApiKeyStore, PredictionStore};

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Database connection lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(String),
}

/// SQLite storage adapter.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite database (for testing).
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.lock()?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS predictions (
                id INTEGER PRIMARY KEY,
                age INTEGER NOT NULL,
                sex INTEGER NOT NULL,
                cp INTEGER NOT NULL,
                trestbps INTEGER NOT NULL,
                chol INTEGER NOT NULL,
                fbs INTEGER NOT NULL,
                restecg INTEGER NOT NULL,
                thalach INTEGER NOT NULL,
                exang INTEGER NOT NULL,
                oldpeak REAL NOT NULL,
                slope INTEGER NOT NULL,
                ca INTEGER NOT NULL,
                thal INTEGER NOT NULL,
                risk_probability REAL NOT NULL,
                risk_level TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_predictions_created
                ON predictions(created_at DESC);

            CREATE TABLE IF NOT EXISTS api_keys (
                key_sha256 TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );
            ",
        )?;

        Ok(())
    }
}

impl PredictionStore for SqliteStore {
    type Error = StorageError;

    fn save_prediction(&self, record: &PredictionRecord) -> Result<(), Self::Error> {
        let conn = self.lock()?;
        let p = &record.patient;

        conn.execute(
            r"
            INSERT INTO predictions (
                age, sex, cp, trestbps, chol, fbs, restecg, thalach, exang,
                oldpeak, slope, ca, thal, risk_probability, risk_level, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            ",
            params![
                p.age,
                p.sex,
                p.cp,
                p.trestbps,
                p.chol,
                p.fbs,
                p.restecg,
                p.thalach,
                p.exang,
                p.oldpeak,
                p.slope,
                p.ca,
                p.thal,
                record.risk_probability,
                record.risk_level.as_str(),
                record.created_at.to_rfc3339(),
            ],
        )?;

        tracing::debug!(id = conn.last_insert_rowid(), "Saved prediction to storage");
        Ok(())
    }

    fn count_predictions(&self) -> Result<usize, Self::Error> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM predictions", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn recent_predictions(&self, limit: usize) -> Result<Vec<PredictionRecord>, Self::Error> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r"
            SELECT age, sex, cp, trestbps, chol, fbs, restecg, thalach, exang,
                   oldpeak, slope, ca, thal, risk_probability, risk_level, created_at
            FROM predictions
            ORDER BY id DESC
            LIMIT ?1
            ",
        )?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                let patient = PatientRecord {
                    age: row.get(0)?,
                    sex: row.get(1)?,
                    cp: row.get(2)?,
                    trestbps: row.get(3)?,
                    chol: row.get(4)?,
                    fbs: row.get(5)?,
                    restecg: row.get(6)?,
                    thalach: row.get(7)?,
                    exang: row.get(8)?,
                    oldpeak: row.get(9)?,
                    slope: row.get(10)?,
                    ca: row.get(11)?,
                    thal: row.get(12)?,
                };
                let risk_probability: f64 = row.get(13)?;
                let risk_level: String = row.get(14)?;
                let created_at: String = row.get(15)?;
                Ok((patient, risk_probability, risk_level, created_at))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(patient, risk_probability, risk_level, created_at)| {
                let risk_level = RiskLevel::parse(&risk_level).ok_or_else(|| {
                    StorageError::Serialization(format!("unknown risk level {risk_level:?}"))
                })?;
                let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
                    .map(|dt| dt.with_timezone(&chrono::Utc))
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(PredictionRecord {
                    patient,
                    risk_probability,
                    risk_level,
                    created_at,
                })
            })
            .collect()
    }
}

impl ApiKeyStore for SqliteStore {
    type Error = StorageError;

    fn has_api_key(&self, key: &str) -> Result<bool, Self::Error> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM api_keys WHERE key_sha256 = ?1",
            params![sha256_hex(key.as_bytes())],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn insert_api_key(&self, key: &str) -> Result<(), Self::Error> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO api_keys (key_sha256, created_at) VALUES (?1, ?2)",
            params![sha256_hex(key.as_bytes()), chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
