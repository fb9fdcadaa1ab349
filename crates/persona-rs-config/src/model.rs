//! Configuration schema for Persona.

use serde::{Deserialize, Serialize};

/// Root config for the Persona memory SDK.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PersonaConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
}

impl PersonaConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> PersonaConfigBuilder {
        PersonaConfigBuilder::new()
    }
}

/// Builder for assembling a `PersonaConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct PersonaConfigBuilder {
    config: PersonaConfig,
}

impl PersonaConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: PersonaConfig::default(),
        }
    }

    /// Replace the memory configuration.
    pub fn memory(mut self, memory: MemoryConfig) -> Self {
        self.config.memory = memory;
        self
    }

    /// Replace the oracle configuration.
    pub fn oracle(mut self, oracle: OracleConfig) -> Self {
        self.config.oracle = oracle;
        self
    }

    /// Finalize and return the built `PersonaConfig`.
    pub fn build(self) -> PersonaConfig {
        self.config
    }
}

/// Fact store and memory policy settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryConfig {
    /// Directory holding one JSON file per user.
    #[serde(default = "default_memory_path")]
    pub path: String,
    #[serde(default = "default_max_records")]
    pub max_records: usize,
    #[serde(default = "default_min_message_chars")]
    pub min_message_chars: usize,
    #[serde(default = "default_source_excerpt_chars")]
    pub source_excerpt_chars: usize,
    #[serde(default = "default_recency_horizon_days")]
    pub recency_horizon_days: f64,
    #[serde(default = "default_temporal_context_len")]
    pub temporal_context_len: usize,
    #[serde(default = "default_snapshot_ttl_secs")]
    pub snapshot_ttl_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            path: default_memory_path(),
            max_records: default_max_records(),
            min_message_chars: default_min_message_chars(),
            source_excerpt_chars: default_source_excerpt_chars(),
            recency_horizon_days: default_recency_horizon_days(),
            temporal_context_len: default_temporal_context_len(),
            snapshot_ttl_secs: default_snapshot_ttl_secs(),
        }
    }
}

fn default_memory_path() -> String {
    "memories".to_string()
}

fn default_max_records() -> usize {
    50
}

fn default_min_message_chars() -> usize {
    5
}

fn default_source_excerpt_chars() -> usize {
    100
}

fn default_recency_horizon_days() -> f64 {
    365.0
}

fn default_temporal_context_len() -> usize {
    5
}

fn default_snapshot_ttl_secs() -> u64 {
    30
}

/// Reasoning service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OracleConfig {
    /// Provider identifier (`openai` or `none`).
    #[serde(default = "default_oracle_provider")]
    pub provider: String,
    #[serde(default = "default_oracle_model")]
    pub model: String,
    /// Upper bound for a single oracle call.
    #[serde(default = "default_oracle_timeout_secs")]
    pub timeout_secs: u64,
    /// Environment variable holding the provider API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: default_oracle_provider(),
            model: default_oracle_model(),
            timeout_secs: default_oracle_timeout_secs(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// Default oracle provider identifier.
fn default_oracle_provider() -> String {
    "openai".to_string()
}

fn default_oracle_model() -> String {
    "gpt-4.1".to_string()
}

fn default_oracle_timeout_secs() -> u64 {
    30
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
