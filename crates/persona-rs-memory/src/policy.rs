//! Memory capture, eviction and retrieval policy.

use std::time::Duration;

/// Tunables shared by extraction, eviction and retrieval.
#[derive(Debug, Clone)]
pub struct MemoryPolicy {
    /// Maximum records kept per user store.
    pub max_records: usize,
    /// Messages shorter than this (in chars) are never considered.
    pub min_message_chars: usize,
    /// Characters of the triggering message kept in `source`.
    pub source_excerpt_chars: usize,
    /// Age in days at which the recency bonus reaches zero.
    pub recency_horizon_days: f64,
    /// Number of most recent records shown as temporal context.
    pub temporal_context_len: usize,
    /// How long a loaded store may be served to retrieval.
    pub snapshot_ttl: Duration,
    /// Upper bound for a single oracle call.
    pub oracle_timeout: Duration,
}

impl Default for MemoryPolicy {
    /// Default memory policy settings.
    fn default() -> Self {
        Self {
            max_records: 50,
            min_message_chars: 5,
            source_excerpt_chars: 100,
            recency_horizon_days: 365.0,
            temporal_context_len: 5,
            snapshot_ttl: Duration::from_secs(30),
            oracle_timeout: Duration::from_secs(30),
        }
    }
}
