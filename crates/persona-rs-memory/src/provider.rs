//! Fact store interface and the default JSON file implementation.

use crate::error::MemoryError;
use crate::eviction::evict;
use crate::locks::StoreLocks;
use crate::model::{FactPayload, MemoryRecord, MemoryStore, StoreKey};
use crate::policy::MemoryPolicy;
use crate::redundancy::{Redundancy, RedundancyRules, consolidate};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Result of merging a fact into a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Stored as a new record.
    Appended,
    /// Merged into the record at this index before eviction.
    Consolidated(usize),
    /// Refused (meta keys or query-like values).
    Rejected,
}

impl UpsertOutcome {
    /// Whether the fact ended up in the store.
    pub fn is_saved(self) -> bool {
        !matches!(self, UpsertOutcome::Rejected)
    }
}

#[async_trait]
/// Persistence for per-user memory stores.
pub trait FactStore: Send + Sync {
    /// Load the latest store for a key. Missing stores load empty.
    async fn load(&self, key: &StoreKey) -> Result<MemoryStore, MemoryError>;

    /// Replace the persisted store.
    async fn save(&self, store: &MemoryStore) -> Result<(), MemoryError>;

    /// Merge a fact into the store as one critical section per user.
    async fn upsert(
        &self,
        key: &StoreKey,
        fact: FactPayload,
        source: &str,
    ) -> Result<UpsertOutcome, MemoryError>;

    /// Read-only view that may be served from a short-lived cache.
    async fn snapshot(&self, key: &StoreKey) -> Result<MemoryStore, MemoryError> {
        self.load(key).await
    }
}

/// JSON-file fact store with one file per `(platform, user)`.
#[derive(Debug, Clone)]
pub struct FileFactStore {
    /// Root directory for store files.
    root: PathBuf,
    locks: StoreLocks,
    snapshots: Arc<Mutex<HashMap<PathBuf, (Instant, MemoryStore)>>>,
    rules: RedundancyRules,
    max_records: usize,
    recency_horizon_days: f64,
    snapshot_ttl: Duration,
}

impl FileFactStore {
    /// Create a store under `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        info!("initialized file fact store (root={})", root.display());
        let policy = MemoryPolicy::default();
        Ok(Self {
            root,
            locks: StoreLocks::new(),
            snapshots: Arc::new(Mutex::new(HashMap::new())),
            rules: RedundancyRules::default(),
            max_records: policy.max_records,
            recency_horizon_days: policy.recency_horizon_days,
            snapshot_ttl: policy.snapshot_ttl,
        })
    }

    /// Apply size cap, recency horizon and snapshot lifetime from a policy.
    pub fn with_policy(mut self, policy: &MemoryPolicy) -> Self {
        self.max_records = policy.max_records;
        self.recency_horizon_days = policy.recency_horizon_days;
        self.snapshot_ttl = policy.snapshot_ttl;
        self
    }

    /// Replace the redundancy rules used by `upsert`.
    pub fn with_rules(mut self, rules: RedundancyRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path for a key: `<platform>_<user>.json` with unsafe characters
    /// percent-encoded.
    pub fn path_for(&self, key: &StoreKey) -> Result<PathBuf, MemoryError> {
        if key.platform.trim().is_empty() || key.user_id.trim().is_empty() {
            return Err(MemoryError::InvalidKey(format!(
                "platform and user id must be non-empty (key={key})"
            )));
        }
        let name = format!(
            "{}_{}.json",
            encode_component(&key.platform),
            encode_component(&key.user_id)
        );
        Ok(self.root.join(name))
    }

    fn read_store(&self, key: &StoreKey, path: &Path) -> Result<MemoryStore, MemoryError> {
        if !path.exists() {
            return Ok(MemoryStore::new(key, Utc::now()));
        }
        let raw = std::fs::read_to_string(path)?;
        let store: MemoryStore = serde_json::from_str(&raw)?;
        Ok(store)
    }

    /// Write via a uniquely named temp file renamed into place.
    fn write_store(&self, path: &Path, store: &MemoryStore) -> Result<(), MemoryError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = self
            .root
            .join(format!(".{file_name}.{}.tmp", Uuid::new_v4()));
        let body = serde_json::to_string_pretty(store)?;
        let written = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .and_then(|mut file| {
                file.write_all(body.as_bytes())?;
                file.sync_all()
            })
            .and_then(|()| std::fs::rename(&temp_path, path));
        if let Err(err) = written {
            let _ = std::fs::remove_file(&temp_path);
            return Err(err.into());
        }
        self.cache_snapshot(path.to_path_buf(), store.clone());
        Ok(())
    }

    /// Cache a freshly read or written store, dropping expired entries.
    fn cache_snapshot(&self, path: PathBuf, store: MemoryStore) {
        let mut snapshots = self.snapshots.lock();
        snapshots.retain(|_, (loaded_at, _)| loaded_at.elapsed() < self.snapshot_ttl);
        snapshots.insert(path, (Instant::now(), store));
    }

    fn upsert_locked(
        &self,
        key: &StoreKey,
        fact: FactPayload,
        source: &str,
    ) -> Result<UpsertOutcome, MemoryError> {
        let path = self.path_for(key)?;
        let lock = self.locks.lock_for(&path);
        let _guard = lock.lock();

        let mut store = self.read_store(key, &path)?;
        let now = Utc::now();
        let outcome = match self.rules.find(&fact, &store.records) {
            Redundancy::Rejected => {
                debug!(
                    "memory rejected (platform={}, user_id={}, category={})",
                    key.platform, key.user_id, fact.category
                );
                return Ok(UpsertOutcome::Rejected);
            }
            Redundancy::Duplicate(index) => {
                consolidate(&mut store.records[index], &fact, now);
                info!(
                    "memory consolidated (platform={}, user_id={}, index={})",
                    key.platform, key.user_id, index
                );
                UpsertOutcome::Consolidated(index)
            }
            Redundancy::Novel => {
                store
                    .records
                    .push(MemoryRecord::from_fact(fact, source, now));
                info!(
                    "memory appended (platform={}, user_id={}, records={})",
                    key.platform,
                    key.user_id,
                    store.records.len()
                );
                UpsertOutcome::Appended
            }
        };

        store.last_updated = now;
        let before = store.records.len();
        store.records = evict(
            std::mem::take(&mut store.records),
            self.max_records,
            now,
            self.recency_horizon_days,
        );
        if store.records.len() < before {
            info!(
                "memory evicted (platform={}, user_id={}, removed={}, remaining={})",
                key.platform,
                key.user_id,
                before - store.records.len(),
                store.records.len()
            );
        }
        self.write_store(&path, &store)?;
        Ok(outcome)
    }

    /// Whole-store replacement; the record cap still applies.
    fn save_locked(&self, store: &MemoryStore) -> Result<(), MemoryError> {
        let path = self.path_for(&store.key())?;
        let mut store = store.clone();
        store.records = evict(
            std::mem::take(&mut store.records),
            self.max_records,
            Utc::now(),
            self.recency_horizon_days,
        );
        let lock = self.locks.lock_for(&path);
        let _guard = lock.lock();
        self.write_store(&path, &store)?;
        debug!(
            "saved memory store (platform={}, user_id={}, records={})",
            store.platform,
            store.user_id,
            store.records.len()
        );
        Ok(())
    }

    /// Reads and caches under the file lock so a concurrent write cannot be
    /// shadowed by an older read.
    fn snapshot_cached(&self, key: &StoreKey) -> Result<MemoryStore, MemoryError> {
        let path = self.path_for(key)?;
        let lock = self.locks.lock_for(&path);
        let _guard = lock.lock();
        let cached = self
            .snapshots
            .lock()
            .get(&path)
            .filter(|(loaded_at, _)| loaded_at.elapsed() < self.snapshot_ttl)
            .map(|(_, store)| store.clone());
        if let Some(store) = cached {
            return Ok(store);
        }
        let store = self.read_store(key, &path)?;
        self.cache_snapshot(path, store.clone());
        Ok(store)
    }
}

#[async_trait]
impl FactStore for FileFactStore {
    async fn load(&self, key: &StoreKey) -> Result<MemoryStore, MemoryError> {
        let path = self.path_for(key)?;
        self.read_store(key, &path)
    }

    async fn save(&self, store: &MemoryStore) -> Result<(), MemoryError> {
        self.save_locked(store)
    }

    async fn upsert(
        &self,
        key: &StoreKey,
        fact: FactPayload,
        source: &str,
    ) -> Result<UpsertOutcome, MemoryError> {
        self.upsert_locked(key, fact, source)
    }

    async fn snapshot(&self, key: &StoreKey) -> Result<MemoryStore, MemoryError> {
        self.snapshot_cached(key)
    }
}

/// Percent-encode every byte outside `[A-Za-z0-9.@-]`.
fn encode_component(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'@' | b'-') {
            encoded.push(byte as char);
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }
    encoded
}
