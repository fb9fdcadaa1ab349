//! Error types for config loading and validation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned while loading or validating Persona config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file could not be read.
    #[error("cannot read config: {0}")]
    ReadFailed(#[from] std::io::Error),
    /// A layer file could not be read; carries the offending path.
    #[error("cannot read config layer {path}: {source}")]
    LayerUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    /// JSON5 syntax error.
    #[error("malformed JSON5 config: {0}")]
    ParseFailed(#[from] json5::Error),
    /// The merged document does not match the config model.
    #[error("config does not match schema: {0}")]
    DecodeFailed(#[from] serde_json::Error),
    /// A field failed schema validation (`layer:dotted.path`).
    #[error("invalid config at {path}: {message}")]
    InvalidField { path: String, message: String },
    /// An override variable holds an unusable value.
    #[error("invalid environment override {var}: {message}")]
    InvalidEnv { var: String, message: String },
    /// Cross-field validation failure.
    #[error("invalid config: {0}")]
    Invalid(String),
}
