//! Public SDK surface for Persona.
//!
//! This crate re-exports the memory and config crates and adds the pieces
//! that connect them to a language model: the `LlmOracle` adapter, an
//! `OracleRegistry`, and config-driven service assembly.

pub mod error;
pub mod oracle;
pub mod registry;
pub mod service;

/// Re-export for convenience.
pub use persona_rs_config as config;
/// Re-export for convenience.
pub use persona_rs_memory as memory;

pub use error::PersonaError;
pub use oracle::{LlmOracle, oracle_from_config};
pub use registry::OracleRegistry;
pub use service::{build_service, memory_policy};

/// Install `env_logger` when the `logging` feature is on; otherwise a no-op.
///
/// Embedding applications call this once at startup. Repeated calls are
/// ignored.
#[inline]
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::try_init();
    }
}
