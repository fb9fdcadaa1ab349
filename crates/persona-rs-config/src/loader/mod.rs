//! Layered configuration loader with environment overrides.
//!
//! Discovers configuration layers (user, cwd, runtime), validates schema,
//! merges them, applies `PERSONA_*` environment overrides and produces a final
//! `PersonaConfig`.

mod env;
mod layer_io;
mod merge;
mod schema;


use crate::{ConfigError, PersonaConfig};
use layer_io::Presence;
use log::{debug, info};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "persona.json5";
/// Default config directory under the user's home.
const DEFAULT_CONFIG_DIR: &str = ".persona";

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: PersonaConfig,
    /// Metadata for each layer considered during load.
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// User-specific configuration.
    User,
    /// Current working directory configuration.
    Cwd,
    /// Runtime override files.
    Runtime,
    /// `PERSONA_*` environment variables (highest precedence).
    Env,
}

impl ConfigLayerSource {
    /// Short name used in logs and validation error paths.
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigLayerSource::User => "user",
            ConfigLayerSource::Cwd => "cwd",
            ConfigLayerSource::Runtime => "runtime",
            ConfigLayerSource::Env => "env",
        }
    }
}

/// Metadata about a config layer.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    /// Layer origin (user, cwd, runtime, env).
    pub source: ConfigLayerSource,
    /// Location on disk if present.
    pub path: Option<PathBuf>,
}

/// Options controlling layered config discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory used to resolve the local layer.
    pub cwd: PathBuf,
    /// Optional user config path (defaults to `~/.persona/persona.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Runtime override config paths applied after local layers.
    pub runtime_paths: Vec<PathBuf>,
    /// Environment variables considered for overrides.
    pub env: BTreeMap<String, String>,
}

impl LayeredConfigOptions {
    /// Create options with default layer locations and the process environment.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            user_config_path: layer_io::default_user_config_path(),
            runtime_paths: Vec::new(),
            env: env::process_overrides(),
        }
    }

    /// Add a runtime override config path.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Replace the environment used for overrides.
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }
}

impl PersonaConfig {
    /// Load a single config from a path (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        let value: Value = json5::from_str(&contents)?;
        config_from_value(value, "config")
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Load a layered config stack using the default layer locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        info!(
            "loading layered config with defaults (cwd={})",
            cwd.as_ref().display()
        );
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load a layered config stack using explicit layer locations and overrides.
    ///
    /// Layer precedence (low -> high): user, cwd, runtime files, environment.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = layer_io::canonical_path(&options.cwd);
        debug!("normalized cwd for config load: {}", cwd.display());
        let mut layers = Vec::new();
        let mut merged = Value::Object(serde_json::Map::new());
        let mut seen_paths = HashSet::new();

        let candidates = [
            (ConfigLayerSource::User, options.user_config_path.clone()),
            (ConfigLayerSource::Cwd, Some(cwd.join(DEFAULT_CONFIG_FILE))),
        ]
        .into_iter()
        .filter_map(|(source, path)| path.map(|path| (source, path, Presence::Optional)));
        let runtime = options
            .runtime_paths
            .iter()
            .map(|path| (ConfigLayerSource::Runtime, path.clone(), Presence::Required));

        for (source, path, presence) in candidates.chain(runtime) {
            let Some(LoadedLayer { meta, value }) = layer_io::read_layer(source, &path, presence)?
            else {
                continue;
            };
            if source != ConfigLayerSource::Runtime
                && !seen_paths.insert(layer_io::canonical_path(&path))
            {
                debug!("skipping duplicate layer (source={})", source.as_str());
                continue;
            }
            merge::merge_layer(&mut merged, value);
            layers.push(meta);
        }

        if let Some(overlay) = env::overlay_from_env(&options.env)? {
            debug!("applying environment overrides");
            merge::merge_layer(&mut merged, overlay);
            layers.push(ConfigLayer {
                source: ConfigLayerSource::Env,
                path: None,
            });
        }

        let config = config_from_value(merged, "effective")?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Validate configuration invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory.path.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "memory.path must not be empty".to_string(),
            ));
        }
        if self.memory.max_records == 0 {
            return Err(ConfigError::Invalid(
                "memory.max_records must be at least 1".to_string(),
            ));
        }
        if self.memory.recency_horizon_days <= 0.0 {
            return Err(ConfigError::Invalid(
                "memory.recency_horizon_days must be positive".to_string(),
            ));
        }
        if self.oracle.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "oracle.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Internal representation of a loaded config layer.
#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<PersonaConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: PersonaConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
