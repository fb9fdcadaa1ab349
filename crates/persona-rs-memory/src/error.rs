//! Error types for memory operations.

use std::time::Duration;

/// Errors returned by fact stores, oracles and helpers.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Regex compilation error.
    #[error("regex error: {0}")]
    Regex(String),
    /// The oracle call failed or returned nothing usable.
    #[error("oracle error: {0}")]
    Oracle(String),
    /// The oracle did not answer within the configured timeout.
    #[error("oracle timed out after {0:?}")]
    OracleTimeout(Duration),
    /// A platform or user identifier cannot be used as a store key.
    #[error("invalid store key: {0}")]
    InvalidKey(String),
}
