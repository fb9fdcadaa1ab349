//! Config to policy mapping and memory service assembly.

use crate::error::PersonaError;
use log::info;
use persona_rs_config::{MemoryConfig, OracleConfig, PersonaConfig};
use persona_rs_memory::{FileFactStore, MemoryPolicy, MemoryService, Oracle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Translate config blocks into memory tunables.
pub fn memory_policy(memory: &MemoryConfig, oracle: &OracleConfig) -> MemoryPolicy {
    MemoryPolicy {
        max_records: memory.max_records,
        min_message_chars: memory.min_message_chars,
        source_excerpt_chars: memory.source_excerpt_chars,
        recency_horizon_days: memory.recency_horizon_days,
        temporal_context_len: memory.temporal_context_len,
        snapshot_ttl: Duration::from_secs(memory.snapshot_ttl_secs),
        oracle_timeout: Duration::from_secs(oracle.timeout_secs),
    }
}

/// Build a file-backed memory service.
///
/// Relative `memory.path` values are resolved against `base_dir`.
pub fn build_service(
    config: &PersonaConfig,
    oracle: Arc<dyn Oracle>,
    base_dir: &Path,
) -> Result<MemoryService, PersonaError> {
    let policy = memory_policy(&config.memory, &config.oracle);
    let root = base_dir.join(&config.memory.path);
    let store = FileFactStore::new(&root)?.with_policy(&policy);
    info!(
        "memory service ready (root={}, max_records={})",
        root.display(),
        policy.max_records
    );
    Ok(MemoryService::new(oracle, Arc::new(store), policy)?)
}
