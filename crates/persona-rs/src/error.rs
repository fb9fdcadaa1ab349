//! Error types for the Persona SDK facade.

use persona_rs_config::ConfigError;
use persona_rs_memory::MemoryError;
use thiserror::Error;

/// Errors returned while wiring oracles, config and the memory service.
#[derive(Debug, Error)]
pub enum PersonaError {
    /// Memory subsystem error.
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
    /// Config loading or validation error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Building or calling the language model failed.
    #[error("llm error: {0}")]
    Llm(String),
    /// The configured API key variable is unset.
    #[error("missing api key: set {0}")]
    MissingApiKey(String),
    /// Oracle provider identifier is not supported.
    #[error("unsupported oracle provider: {0}")]
    UnsupportedProvider(String),
    /// Oracle id is not registered.
    #[error("unknown oracle: {0}")]
    UnknownOracle(String),
    /// The registry has no default oracle yet.
    #[error("no default oracle registered")]
    NoDefaultOracle,
}
