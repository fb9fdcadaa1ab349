//! Test helpers shared across Persona crates.

pub mod llm;
pub mod oracle;

pub use llm::{FailingLLM, ScriptedChatResponse, ScriptedLLM};
pub use oracle::{FailingOracle, FixedOracle, HangingOracle, ScriptedOracle};
