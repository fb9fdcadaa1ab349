//! `PERSONA_*` environment overrides.

use crate::ConfigError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Prefix shared by every recognised override variable.
const ENV_PREFIX: &str = "PERSONA_";
const MEMORY_PATH: &str = "PERSONA_MEMORY_PATH";
const ORACLE_MODEL: &str = "PERSONA_ORACLE_MODEL";
const ORACLE_TIMEOUT_SECS: &str = "PERSONA_ORACLE_TIMEOUT_SECS";

/// Snapshot the `PERSONA_*` variables of the current process.
pub(super) fn process_overrides() -> BTreeMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with(ENV_PREFIX))
        .collect()
}

/// Translate override variables into a JSON layer, or `None` when none are set.
pub(super) fn overlay_from_env(
    env: &BTreeMap<String, String>,
) -> Result<Option<Value>, ConfigError> {
    let mut memory = Map::new();
    let mut oracle = Map::new();

    if let Some(path) = non_empty(env, MEMORY_PATH) {
        memory.insert("path".to_string(), Value::String(path.to_string()));
    }
    if let Some(model) = non_empty(env, ORACLE_MODEL) {
        oracle.insert("model".to_string(), Value::String(model.to_string()));
    }
    if let Some(raw) = non_empty(env, ORACLE_TIMEOUT_SECS) {
        let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidEnv {
            var: ORACLE_TIMEOUT_SECS.to_string(),
            message: format!("expected whole seconds, got {raw:?}"),
        })?;
        oracle.insert("timeout_secs".to_string(), Value::from(secs));
    }

    let mut overlay = Map::new();
    if !memory.is_empty() {
        overlay.insert("memory".to_string(), Value::Object(memory));
    }
    if !oracle.is_empty() {
        overlay.insert("oracle".to_string(), Value::Object(oracle));
    }
    if overlay.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Value::Object(overlay)))
    }
}

fn non_empty<'a>(env: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    env.get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}
