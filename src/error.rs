//! Unified error handling for the walklog library.

use thiserror::Error;

/// Error type for store and session operations.
#[derive(Debug, Error)]
pub enum WalkError {
    /// A lookup by id found no row.
    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: i64 },

    /// A required text field was missing or empty at write time.
    #[error("required field '{field}' is missing or empty")]
    ConstraintViolation { field: &'static str },

    /// The location provider could not be acquired or was disabled.
    #[error("location provider unavailable")]
    SensorUnavailable,

    /// File system failure (e.g. deleting a photo's backing file).
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying SQLite failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type alias for walklog operations.
pub type Result<T> = std::result::Result<T, WalkError>;
