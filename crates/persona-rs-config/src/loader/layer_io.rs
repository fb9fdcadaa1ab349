//! Reading config layers from disk.

use super::{
    ConfigLayer, ConfigLayerSource, DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILE, LoadedLayer, schema,
};
use crate::ConfigError;
use directories::BaseDirs;
use log::debug;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Whether a missing layer file is tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Presence {
    Optional,
    Required,
}

/// Read, parse and schema-check one layer.
///
/// Returns `None` only for a missing `Optional` layer.
pub(super) fn read_layer(
    source: ConfigLayerSource,
    path: &Path,
    presence: Presence,
) -> Result<Option<LoadedLayer>, ConfigError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound && presence == Presence::Optional => {
            debug!(
                "config layer absent (source={}, path={})",
                source.as_str(),
                path.display()
            );
            return Ok(None);
        }
        Err(err) => {
            return Err(ConfigError::LayerUnreadable {
                path: path.to_path_buf(),
                source: err,
            });
        }
    };
    let value: Value = json5::from_str(&contents)?;
    schema::validate_layer_schema(&value, &format!("{}({})", source.as_str(), path.display()))?;
    debug!(
        "config layer read (source={}, path={})",
        source.as_str(),
        path.display()
    );
    Ok(Some(LoadedLayer {
        meta: ConfigLayer {
            source,
            path: Some(path.to_path_buf()),
        },
        value,
    }))
}

/// `~/.persona/persona.json5`, when a home directory is known.
pub(super) fn default_user_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| {
        dirs.home_dir()
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILE)
    })
}

/// Canonical form of `path`, or the path itself when it cannot be resolved.
pub(super) fn canonical_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
