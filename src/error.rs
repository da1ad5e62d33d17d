//! Error types for seriesdb
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::measurement::MeasurementType;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for seriesdb operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Catalog Errors
    // -------------------------------------------------------------------------
    #[error("Catalog corruption detected: {0}")]
    CatalogCorruption(String),

    #[error("Series '{name}' has type {stored} but was provided {provided}")]
    TypeMismatch {
        name: String,
        stored: MeasurementType,
        provided: MeasurementType,
    },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Worker Errors
    // -------------------------------------------------------------------------
    /// The on-disk state can no longer be trusted; the store stopped accepting work
    #[error("Fatal storage error: {0}")]
    Fatal(String),

    #[error("Disk store worker is not running")]
    WorkerStopped,
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
