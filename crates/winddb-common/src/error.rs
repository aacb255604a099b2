//! Error types for winddb crates.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using WindDbError.
pub type WindDbResult<T> = Result<T, WindDbError>;

/// Primary error type for winddb operations.
#[derive(Debug, Error)]
pub enum WindDbError {
    // === Source Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Query failed for station '{station}': {message}")]
    Query { station: String, message: String },

    #[error("No source configured for handler: {0}")]
    UnknownHandler(String),

    // === Input Errors ===
    #[error("Invalid station id '{id}': {reason}")]
    InvalidStationId { id: String, reason: &'static str },

    #[error("Invalid configuration: {0}")]
    Config(String),

    // === Output Errors ===
    #[error("Failed to write output: {0}")]
    Output(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // === Infrastructure Errors ===
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

impl WindDbError {
    /// Build a query failure for a station from any displayable driver error.
    pub fn query(station: impl Into<String>, err: impl std::fmt::Display) -> Self {
        WindDbError::Query {
            station: station.into(),
            message: err.to_string(),
        }
    }

    /// True when the error came from a backing store read.
    pub fn is_query_failure(&self) -> bool {
        matches!(self, WindDbError::Query { .. } | WindDbError::Database(_))
    }
}

// Conversion from common error types
impl From<std::io::Error> for WindDbError {
    fn from(err: std::io::Error) -> Self {
        WindDbError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for WindDbError {
    fn from(err: serde_json::Error) -> Self {
        WindDbError::Serialization(format!("JSON error: {}", err))
    }
}
