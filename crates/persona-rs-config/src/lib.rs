//! Persona configuration.
//!
//! Holds the JSON5 config model for memory and oracle settings, its schema
//! checks, and the loader that stacks user, cwd, runtime and `PERSONA_*`
//! environment layers.

mod error;
mod loader;
mod model;

pub use error::ConfigError;
pub use loader::{ConfigLayer, ConfigLayerSource, LayeredConfig, LayeredConfigOptions};
pub use model::*;
