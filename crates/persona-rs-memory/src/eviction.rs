//! Size-capped eviction by importance and recency.

use crate::model::MemoryRecord;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Recency bonus in `[0, 1]`, decaying linearly over `horizon_days`.
pub fn recency(record: &MemoryRecord, now: DateTime<Utc>, horizon_days: f64) -> f64 {
    if horizon_days <= 0.0 {
        return 0.0;
    }
    let age_days = (now - record.timestamp).num_seconds() as f64 / SECONDS_PER_DAY;
    (1.0 - age_days / horizon_days).clamp(0.0, 1.0)
}

/// Eviction score: importance weight plus recency bonus.
pub fn score(record: &MemoryRecord, now: DateTime<Utc>, horizon_days: f64) -> f64 {
    record.importance.weight() + recency(record, now, horizon_days)
}

/// Keep the `cap` highest scoring records, sorted by score descending.
///
/// Ties go to the newer record, then to the earlier original position.
/// Stores already within the cap are returned untouched.
pub fn evict(
    records: Vec<MemoryRecord>,
    cap: usize,
    now: DateTime<Utc>,
    horizon_days: f64,
) -> Vec<MemoryRecord> {
    if records.len() <= cap {
        return records;
    }
    let mut scored = records
        .into_iter()
        .enumerate()
        .map(|(position, record)| (score(&record, now, horizon_days), position, record))
        .collect::<Vec<_>>();
    scored.sort_by(|(left_score, left_pos, left), (right_score, right_pos, right)| {
        right_score
            .partial_cmp(left_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| right.timestamp.cmp(&left.timestamp))
            .then_with(|| left_pos.cmp(right_pos))
    });
    scored.truncate(cap);
    scored.into_iter().map(|(_, _, record)| record).collect()
}

#[cfg(test)]
mod tests {
    use super::{evict, recency, score};
    use crate::model::{FactPayload, Importance, MemoryRecord};
    use chrono::{DateTime, Duration, Utc};
    use pretty_assertions::assert_eq;

    fn aged(value: &str, importance: Importance, now: DateTime<Utc>, days: i64) -> MemoryRecord {
        MemoryRecord::from_fact(
            FactPayload::new("personal_info", importance).with_fact("fact", value),
            "User message: test",
            now - Duration::days(days),
        )
    }

    fn values(records: &[MemoryRecord]) -> Vec<&str> {
        records
            .iter()
            .map(|record| record.data["fact"].as_str())
            .collect()
    }

    #[test]
    fn recency_is_fractional_and_clamped() {
        let now = Utc::now();
        let half = MemoryRecord {
            timestamp: now - Duration::hours(12),
            ..aged("a", Importance::Low, now, 0)
        };
        let ancient = aged("b", Importance::Low, now, 800);
        let future = aged("c", Importance::Low, now, -5);
        assert!((recency(&half, now, 365.0) - (1.0 - 0.5 / 365.0)).abs() < 1e-9);
        assert_eq!(recency(&ancient, now, 365.0), 0.0);
        assert_eq!(recency(&future, now, 365.0), 1.0);
        assert_eq!(score(&ancient, now, 365.0), 1.0);
    }

    #[test]
    fn evict_within_cap_is_identity() {
        let now = Utc::now();
        let records = vec![
            aged("a", Importance::Low, now, 10),
            aged("b", Importance::High, now, 1),
        ];
        assert_eq!(evict(records.clone(), 2, now, 365.0), records);
    }

    #[test]
    fn evict_drops_lowest_scores_and_sorts_descending() {
        let now = Utc::now();
        let records = vec![
            aged("old-low", Importance::Low, now, 400),
            aged("new-high", Importance::High, now, 1),
            aged("mid-medium", Importance::Medium, now, 100),
            aged("new-low", Importance::Low, now, 1),
        ];
        let kept = evict(records, 3, now, 365.0);
        assert_eq!(values(&kept), vec!["new-high", "mid-medium", "new-low"]);
    }

    #[test]
    fn evict_ties_prefer_newer_then_earlier_position() {
        let now = Utc::now();
        let records = vec![
            aged("first", Importance::Low, now, 500),
            aged("second", Importance::Low, now, 600),
            aged("third", Importance::Low, now, 500),
            aged("fresh", Importance::Low, now, 0),
        ];
        // All three old records score 1.0; the older one loses the tie.
        let kept = evict(records, 3, now, 365.0);
        assert_eq!(values(&kept), vec!["fresh", "first", "third"]);
    }
}
