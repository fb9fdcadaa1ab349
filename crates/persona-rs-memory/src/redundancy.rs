//! Duplicate detection and consolidation of extracted facts.

use crate::model::{FactPayload, MemoryRecord};
use chrono::{DateTime, Utc};

/// Keys that describe a request rather than a fact about the user.
pub const META_KEYS: &[&str] = &[
    "current_location_query",
    "location_request",
    "weather_request",
    "query",
    "request",
    "question",
    "asking",
    "wondering",
];

/// Minimum normalized length for substring matches.
const MIN_SUBSTRING_CHARS: usize = 4;

/// Result of comparing a new fact with the stored records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redundancy {
    /// Nothing similar is stored.
    Novel,
    /// The record at this index already holds the fact.
    Duplicate(usize),
    /// The fact carries meta keys or query-like values and must not be stored.
    Rejected,
}

/// Rules used to compare facts across records.
#[derive(Debug, Clone)]
pub struct RedundancyRules {
    links: Vec<(String, String)>,
}

impl Default for RedundancyRules {
    /// Link `location`/`current_location` and `name`/`real_name`.
    fn default() -> Self {
        Self {
            links: vec![
                ("location".to_string(), "current_location".to_string()),
                ("name".to_string(), "real_name".to_string()),
            ],
        }
    }
}

impl RedundancyRules {
    /// Treat two keys as naming the same fact regardless of category.
    pub fn with_link(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.links.push((left.into(), right.into()));
        self
    }

    /// Keys linked to `key`, including `key` itself.
    fn linked_keys<'a>(&'a self, key: &'a str) -> Vec<&'a str> {
        let mut keys = vec![key];
        for (left, right) in &self.links {
            if left == key {
                keys.push(right.as_str());
            } else if right == key {
                keys.push(left.as_str());
            }
        }
        keys
    }

    /// Classify a new fact against existing records.
    pub fn find(&self, fact: &FactPayload, records: &[MemoryRecord]) -> Redundancy {
        if fact.data.is_empty() || is_meta_fact(fact) {
            return Redundancy::Rejected;
        }
        for (index, record) in records.iter().enumerate() {
            if record.category == fact.category
                && fact.data.iter().any(|(key, value)| {
                    record
                        .data
                        .get(key)
                        .is_some_and(|existing| values_overlap(existing, value))
                })
            {
                return Redundancy::Duplicate(index);
            }
            if self.linked_match(fact, record) {
                return Redundancy::Duplicate(index);
            }
        }
        Redundancy::Novel
    }

    /// Cross-category match for keys in the link table, the key itself
    /// included. Unlinked keys only match within one category.
    fn linked_match(&self, fact: &FactPayload, record: &MemoryRecord) -> bool {
        fact.data.iter().any(|(key, value)| {
            let keys = self.linked_keys(key);
            keys.len() > 1
                && keys.into_iter().any(|linked| {
                    record
                        .data
                        .get(linked)
                        .is_some_and(|existing| values_overlap(existing, value))
                })
        })
    }

    /// Whether any record already holds `value` under `key` or a linked key.
    pub fn is_known_value(&self, records: &[MemoryRecord], key: &str, value: &str) -> bool {
        let keys = self.linked_keys(key);
        records.iter().any(|record| {
            keys.iter().any(|key| {
                record
                    .data
                    .get(*key)
                    .is_some_and(|existing| values_overlap(existing, value))
            })
        })
    }
}

/// Classify a fact using the default rules.
pub fn find_redundant(fact: &FactPayload, records: &[MemoryRecord]) -> Redundancy {
    RedundancyRules::default().find(fact, records)
}

/// Merge `fact` into `record`: new values win, timestamp refreshes and
/// importance never decreases.
pub fn consolidate(record: &mut MemoryRecord, fact: &FactPayload, now: DateTime<Utc>) {
    for (key, value) in &fact.data {
        record.data.insert(key.clone(), value.clone());
    }
    record.timestamp = now;
    record.importance = record.importance.max(fact.importance);
}

/// Whether the fact is about the conversation rather than the user.
pub fn is_meta_fact(fact: &FactPayload) -> bool {
    fact.data
        .iter()
        .any(|(key, value)| is_meta_key(key) || reads_as_query(value))
}

fn is_meta_key(key: &str) -> bool {
    let key = normalize(key);
    META_KEYS.iter().any(|meta| *meta == key)
}

fn reads_as_query(value: &str) -> bool {
    let value = normalize(value);
    if value.ends_with('?') {
        return true;
    }
    value
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .any(|word| !word.is_empty() && META_KEYS.contains(&word))
}

/// Case-folded, trimmed form used for all comparisons.
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Equal after normalization, or one contains the other when both are long
/// enough to make substring matches meaningful.
pub fn values_overlap(left: &str, right: &str) -> bool {
    let left = normalize(left);
    let right = normalize(right);
    if left == right {
        return true;
    }
    left.chars().count() >= MIN_SUBSTRING_CHARS
        && right.chars().count() >= MIN_SUBSTRING_CHARS
        && (left.contains(&right) || right.contains(&left))
}

#[cfg(test)]
mod tests {
    use super::{Redundancy, RedundancyRules, consolidate, find_redundant, values_overlap};
    use crate::model::{FactPayload, Importance, MemoryRecord};
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;

    fn record(category: &str, key: &str, value: &str, importance: Importance) -> MemoryRecord {
        MemoryRecord::from_fact(
            FactPayload::new(category, importance).with_fact(key, value),
            "User message: test",
            Utc::now() - Duration::days(3),
        )
    }

    #[test]
    fn values_overlap_requires_four_chars_for_substrings() {
        assert!(values_overlap(" Sarah ", "sarah"));
        assert!(values_overlap("New York", "new york city"));
        assert!(!values_overlap("Al", "Alice"));
        assert!(!values_overlap("Paris", "Berlin"));
    }

    #[test]
    fn same_category_duplicate_is_detected() {
        let records = vec![
            record("hobby", "sport", "tennis", Importance::Low),
            record("personal_info", "name", "Sarah", Importance::High),
        ];
        let fact = FactPayload::new("personal_info", Importance::Medium).with_fact("name", "sarah");
        assert_eq!(find_redundant(&fact, &records), Redundancy::Duplicate(1));
    }

    #[test]
    fn linked_key_matches_itself_across_categories() {
        let records = vec![record("personal_info", "name", "Sarah", Importance::High)];
        let fact =
            FactPayload::new("personal_identity", Importance::High).with_fact("name", "Sarah");
        assert_eq!(find_redundant(&fact, &records), Redundancy::Duplicate(0));

        let records = vec![record("personal_info", "location", "Tokyo", Importance::High)];
        let fact = FactPayload::new("location", Importance::Medium).with_fact("location", "tokyo");
        assert_eq!(find_redundant(&fact, &records), Redundancy::Duplicate(0));
    }

    #[test]
    fn unlinked_key_in_another_category_is_novel() {
        let records = vec![record("hobby", "sport", "tennis", Importance::Low)];
        let fact = FactPayload::new("fitness", Importance::Medium).with_fact("sport", "tennis");
        assert_eq!(find_redundant(&fact, &records), Redundancy::Novel);
    }

    #[test]
    fn linked_keys_match_across_categories() {
        let records = vec![record("personal_info", "location", "Berlin", Importance::High)];
        let fact =
            FactPayload::new("travel", Importance::Medium).with_fact("current_location", "berlin");
        assert_eq!(find_redundant(&fact, &records), Redundancy::Duplicate(0));

        let records = vec![record("identity", "real_name", "Sam", Importance::High)];
        let fact = FactPayload::new("personal_info", Importance::High).with_fact("name", "Sam");
        assert_eq!(find_redundant(&fact, &records), Redundancy::Duplicate(0));
    }

    #[test]
    fn custom_links_extend_the_table() {
        let rules = RedundancyRules::default().with_link("job", "occupation");
        let records = vec![record("work", "occupation", "nurse", Importance::High)];
        let fact = FactPayload::new("career", Importance::High).with_fact("job", "Nurse");
        assert_eq!(rules.find(&fact, &records), Redundancy::Duplicate(0));
        assert!(rules.is_known_value(&records, "job", "nurse"));
    }

    #[test]
    fn meta_keys_and_queries_are_rejected() {
        let by_key = FactPayload::new("personal_info", Importance::Low)
            .with_fact("weather_request", "sunny");
        let by_word = FactPayload::new("personal_info", Importance::Low)
            .with_fact("topic", "a question about Rust");
        let by_mark =
            FactPayload::new("personal_info", Importance::Low).with_fact("place", "where am I?");
        let fine = FactPayload::new("personal_info", Importance::Low)
            .with_fact("hobby", "requesting songs");
        assert_eq!(find_redundant(&by_key, &[]), Redundancy::Rejected);
        assert_eq!(find_redundant(&by_word, &[]), Redundancy::Rejected);
        assert_eq!(find_redundant(&by_mark, &[]), Redundancy::Rejected);
        assert_eq!(find_redundant(&fine, &[]), Redundancy::Novel);
    }

    #[test]
    fn consolidate_merges_and_never_downgrades() {
        let mut existing = record("personal_info", "name", "Sarah", Importance::High);
        let before = existing.timestamp;
        let fact = FactPayload::new("personal_info", Importance::Low)
            .with_fact("name", "Sarah")
            .with_fact("nickname", "Sal");
        let now = Utc::now();
        consolidate(&mut existing, &fact, now);
        assert_eq!(existing.importance, Importance::High);
        assert_eq!(existing.data["nickname"], "Sal");
        assert_eq!(existing.timestamp, now);
        assert!(existing.timestamp > before);
    }
}
