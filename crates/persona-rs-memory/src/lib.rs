//! Long-term user fact memory for Persona.

pub mod error;
pub mod eviction;
pub mod extraction;
pub mod fallback;
pub mod locks;
pub mod model;
pub mod oracle;
pub mod policy;
pub mod provider;
pub mod redundancy;
pub mod retrieval;
pub mod service;
pub mod tags;

/// Memory error type.
pub use error::MemoryError;
/// Extraction decision and low-value filter.
pub use extraction::{ExtractionDecision, Extractor, is_low_value};
/// Rule-based fallback extractor.
pub use fallback::FallbackExtractor;
/// Per-file lock registry.
pub use locks::StoreLocks;
/// Memory records, stores and message models.
pub use model::{
    FactData, FactPayload, Importance, InboundMessage, MemoryRecord, MemoryStore, StoreKey,
};
/// Oracle boundary.
pub use oracle::{NoOracle, Oracle, OracleRequest, consult_with_timeout};
/// Memory tunables.
pub use policy::MemoryPolicy;
/// Fact store interface and default file implementation.
pub use provider::{FactStore, FileFactStore, UpsertOutcome};
/// Redundancy classification and consolidation.
pub use redundancy::{Redundancy, RedundancyRules, consolidate, find_redundant};
/// Relevance retrieval types.
pub use retrieval::{
    IntentCues, MessageIntent, RelevanceTier, RelevantMemory, RetrievalOutcome, Retriever,
};
/// Service entry points.
pub use service::{MemoryService, RememberOutcome};
