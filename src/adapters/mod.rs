//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external libraries:
//! - `ensemble`: JSON tree-ensemble model, signed-artifact checks, TreeSHAP
//! - `sqlite`: SQLite prediction log and API key registry
//! - `pdf`: report rendering
//! - `sanitize`: secret filtering for logs

pub mod ensemble;
pub mod pdf;
pub mod sanitize;
pub mod sqlite;

// Re-export storage error for lib.rs
pub use sqlite::StorageError;
