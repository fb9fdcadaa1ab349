//! Memory record and store models persisted by fact stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Category assigned when neither the oracle nor a rule names one.
pub const DEFAULT_CATEGORY: &str = "personal_info";

/// Fact-key to fact-value mapping carried by a record.
pub type FactData = BTreeMap<String, String>;

/// How much a fact matters when ranking records for eviction.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    #[default]
    Medium,
    High,
}

impl Importance {
    /// Eviction weight for this importance level.
    pub fn weight(self) -> f64 {
        match self {
            Importance::Low => 1.0,
            Importance::Medium => 2.0,
            Importance::High => 3.0,
        }
    }

    /// Return the importance as a lowercase string.
    pub fn as_str(self) -> &'static str {
        match self {
            Importance::Low => "low",
            Importance::Medium => "medium",
            Importance::High => "high",
        }
    }

    /// Parse an importance label, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Importance::Low),
            "medium" | "moderate" => Some(Importance::Medium),
            "high" => Some(Importance::High),
            _ => None,
        }
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one user's memory file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    /// Platform identifier (e.g. `discord`, `matrix`).
    pub platform: String,
    /// Platform-specific user identifier.
    pub user_id: String,
}

impl StoreKey {
    pub fn new(platform: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            user_id: user_id.into(),
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform, self.user_id)
    }
}

/// A fact produced by extraction, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactPayload {
    pub category: String,
    pub data: FactData,
    pub importance: Importance,
}

impl FactPayload {
    pub fn new(category: impl Into<String>, importance: Importance) -> Self {
        Self {
            category: category.into(),
            data: FactData::new(),
            importance,
        }
    }

    /// Add a single key/value pair.
    pub fn with_fact(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Persisted memory record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    /// Creation or last consolidation timestamp.
    pub timestamp: DateTime<Utc>,
    /// Free-form category label.
    #[serde(default = "default_category")]
    pub category: String,
    /// Fact payload.
    #[serde(default, deserialize_with = "lenient_fact_data")]
    pub data: FactData,
    /// Importance used for eviction ranking.
    #[serde(default, deserialize_with = "lenient_importance")]
    pub importance: Importance,
    /// Excerpt of the message that produced the record.
    #[serde(default)]
    pub source: String,
}

impl MemoryRecord {
    /// Build a fresh record from an extracted fact.
    pub fn from_fact(fact: FactPayload, source: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            timestamp: now,
            category: fact.category,
            data: fact.data,
            importance: fact.importance,
            source: source.into(),
        }
    }

    /// Render the data as `key: value` pairs for prompts and logs.
    pub fn describe(&self) -> String {
        self.data
            .iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Convert a JSON object of fact values into `FactData`.
///
/// Strings are trimmed, other values are kept as their JSON text, and nulls
/// or blank entries are dropped.
pub fn fact_data_from_json(object: &Map<String, Value>) -> FactData {
    let mut facts = FactData::new();
    for (key, value) in object {
        let value = match value {
            Value::Null => continue,
            Value::String(text) => text.trim().to_string(),
            other => other.to_string(),
        };
        if !key.trim().is_empty() && !value.is_empty() {
            facts.insert(key.trim().to_string(), value);
        }
    }
    facts
}

/// Older files hold the oracle's `info` object verbatim, numbers included.
fn lenient_fact_data<'de, D>(deserializer: D) -> Result<FactData, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Object(object)) => fact_data_from_json(&object),
        _ => FactData::new(),
    })
}

/// Unknown or missing labels fall back to `Importance::Medium`.
fn lenient_importance<'de, D>(deserializer: D) -> Result<Importance, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(Value::as_str)
        .and_then(Importance::parse)
        .unwrap_or_default())
}

/// All persisted records for one `(platform, user)` pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryStore {
    pub user_id: String,
    pub platform: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, alias = "memories")]
    pub records: Vec<MemoryRecord>,
}

impl MemoryStore {
    /// Create an empty store for a key.
    pub fn new(key: &StoreKey, now: DateTime<Utc>) -> Self {
        Self {
            user_id: key.user_id.clone(),
            platform: key.platform.clone(),
            created_at: now,
            last_updated: now,
            records: Vec::new(),
        }
    }

    pub fn key(&self) -> StoreKey {
        StoreKey::new(self.platform.clone(), self.user_id.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records ordered by timestamp, newest first.
    pub fn most_recent(&self, limit: usize) -> Vec<&MemoryRecord> {
        let mut records = self.records.iter().collect::<Vec<_>>();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        records
    }
}

/// Inbound chat message handed to the memory subsystem.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Platform message id, when the adapter has one.
    pub message_id: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl InboundMessage {
    /// Message created now without a platform id.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            message_id: None,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }
}

/// Audit excerpt stored in `MemoryRecord::source`.
pub fn source_excerpt(content: &str, max_chars: usize) -> String {
    let mut excerpt = content.chars().take(max_chars).collect::<String>();
    if content.chars().count() > max_chars {
        excerpt.push_str("...");
    }
    format!("User message: {excerpt}")
}

#[cfg(test)]
mod tests {
    use super::{Importance, MemoryRecord, MemoryStore, source_excerpt};
    use pretty_assertions::assert_eq;

    #[test]
    fn importance_is_totally_ordered() {
        assert!(Importance::Low < Importance::Medium);
        assert!(Importance::Medium < Importance::High);
        assert_eq!(Importance::Low.max(Importance::High), Importance::High);
        assert_eq!(Importance::parse(" HIGH "), Some(Importance::High));
        assert_eq!(Importance::parse("urgent"), None);
    }

    #[test]
    fn source_excerpt_truncates_on_char_boundary() {
        assert_eq!(source_excerpt("hello", 10), "User message: hello");
        assert_eq!(source_excerpt("héllo wörld", 5), "User message: héllo...");
    }

    #[test]
    fn legacy_memories_field_is_accepted() {
        let raw = r#"{
            "user_id": "42",
            "platform": "discord",
            "created_at": "2024-05-01T10:00:00+00:00",
            "last_updated": "2024-05-01T10:00:00+00:00",
            "memories": [
                {
                    "timestamp": "2024-05-01T10:00:00+00:00",
                    "category": "personal_info",
                    "data": {"name": "Sarah"},
                    "importance": "high",
                    "source": "User message: My name is Sarah"
                }
            ]
        }"#;
        let store: MemoryStore = serde_json::from_str(raw).expect("store");
        assert_eq!(store.records.len(), 1);
        assert_eq!(store.records[0].data["name"], "Sarah");
        assert_eq!(store.records[0].importance, Importance::High);
    }

    #[test]
    fn legacy_values_and_labels_are_read_leniently() {
        let raw = r#"{
            "timestamp": "2024-05-01T10:00:00.123456+00:00",
            "category": "personal_info",
            "data": {"age": 28, "vegan": true, "nickname": null, "city": " Oslo "},
            "importance": "urgent"
        }"#;
        let record: MemoryRecord = serde_json::from_str(raw).expect("record");
        assert_eq!(record.data.get("age").map(String::as_str), Some("28"));
        assert_eq!(record.data.get("vegan").map(String::as_str), Some("true"));
        assert_eq!(record.data.get("city").map(String::as_str), Some("Oslo"));
        assert!(!record.data.contains_key("nickname"));
        assert_eq!(record.importance, Importance::Medium);
        assert_eq!(record.source, "");

        let moderate: MemoryRecord = serde_json::from_str(
            r#"{"timestamp": "2024-05-01T10:00:00+00:00", "importance": "Moderate", "data": "n/a"}"#,
        )
        .expect("record");
        assert_eq!(moderate.importance, Importance::Medium);
        assert!(moderate.data.is_empty());
    }
}
