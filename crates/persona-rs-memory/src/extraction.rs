//! Decide whether a message carries a durable fact about its author.

use crate::fallback::FallbackExtractor;
use crate::model::{DEFAULT_CATEGORY, FactPayload, Importance, MemoryStore, fact_data_from_json};
use crate::oracle::{Oracle, OracleRequest, consult_with_timeout};
use crate::policy::MemoryPolicy;
use crate::tags::{extract_flag, extract_tag};
use log::{debug, warn};
use serde_json::Value;

/// Whole-message acknowledgments that never carry facts.
const ACKNOWLEDGMENTS: &[&str] = &[
    "ok", "yes", "no", "hi", "hey", "lol", "haha", "nice", "cool", "thanks",
];

/// Phrases that mark a request rather than a statement.
const LOW_VALUE_PHRASES: &[&str] = &[
    "weather",
    "remember where",
    "located ?",
    "tell me",
    "can you",
];

const EXTRACTION_SYSTEM: &str = "You maintain long-term memory for a conversational agent. \
You decide whether a user's message reveals a lasting personal fact worth remembering. \
Answer only in the requested tag format.";

/// Outcome of the extraction decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionDecision {
    /// Whether a fact should be stored.
    pub should_save: bool,
    /// The fact to store, present when `should_save` is true.
    pub fact: Option<FactPayload>,
    /// Human-readable diagnostics.
    pub reasoning: String,
}

impl ExtractionDecision {
    fn skip(reasoning: impl Into<String>) -> Self {
        Self {
            should_save: false,
            fact: None,
            reasoning: reasoning.into(),
        }
    }

    fn save(fact: FactPayload, reasoning: impl Into<String>) -> Self {
        Self {
            should_save: true,
            fact: Some(fact),
            reasoning: reasoning.into(),
        }
    }
}

/// Whether a message is too short or too generic to consider.
pub fn is_low_value(message: &str, min_chars: usize) -> bool {
    let trimmed = message.trim();
    if trimmed.is_empty() || trimmed.chars().count() < min_chars {
        return true;
    }
    let lowered = trimmed.to_lowercase();
    let bare = lowered.trim_end_matches(['!', '.', '?', ' ']);
    ACKNOWLEDGMENTS.contains(&bare)
        || LOW_VALUE_PHRASES
            .iter()
            .any(|phrase| lowered.contains(phrase))
}

/// Oracle-backed extractor with a deterministic fallback.
pub struct Extractor<'a> {
    pub oracle: &'a dyn Oracle,
    pub fallback: &'a FallbackExtractor,
    pub policy: &'a MemoryPolicy,
}

impl Extractor<'_> {
    /// Decide whether `message` should produce a stored fact.
    ///
    /// Never fails: oracle errors and malformed answers fall through to the
    /// fallback extractor and are reported in `reasoning`.
    pub async fn decide(
        &self,
        message: &str,
        store: &MemoryStore,
        context: Option<&str>,
    ) -> ExtractionDecision {
        if is_low_value(message, self.policy.min_message_chars) {
            return ExtractionDecision::skip("message too short or low value");
        }

        let request = build_extraction_request(message, store, context);
        let declined = match consult_with_timeout(self.oracle, &request, self.policy.oracle_timeout)
            .await
        {
            Ok(raw) => match parse_extraction_answer(&raw) {
                Ok((fact, reasoning)) => {
                    debug!(
                        "oracle extracted fact (category={}, keys={})",
                        fact.category,
                        fact.data.len()
                    );
                    return ExtractionDecision::save(fact, reasoning);
                }
                Err(reasoning) => reasoning,
            },
            Err(err) => {
                warn!("extraction oracle unavailable (error={err})");
                format!("oracle unavailable: {err}")
            }
        };

        match self.fallback.extract(message, &store.records) {
            Some(fact) => {
                debug!(
                    "fallback extractor matched (category={}, keys={})",
                    fact.category,
                    fact.data.len()
                );
                ExtractionDecision::save(
                    fact,
                    format!("fallback extractor matched; {declined}"),
                )
            }
            None => ExtractionDecision::skip(format!("no durable fact; {declined}")),
        }
    }
}

/// Build the oracle request for an extraction decision.
pub fn build_extraction_request(
    message: &str,
    store: &MemoryStore,
    context: Option<&str>,
) -> OracleRequest {
    let existing = if store.records.is_empty() {
        "(none)".to_string()
    } else {
        store
            .records
            .iter()
            .map(|record| {
                format!(
                    "- [{}] {} (importance: {})",
                    record.category,
                    record.describe(),
                    record.importance
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    let context = context
        .filter(|context| !context.trim().is_empty())
        .map(|context| format!("\nConversation context:\n{context}\n"))
        .unwrap_or_default();

    let prompt = format!(
        "User message:\n{message}\n\nAlready remembered about this user:\n{existing}\n{context}
Save only durable personal facts the user states about themselves: name, age, where they \
live or come from, occupation, family, health or dietary needs, and lasting preferences.
Do not save greetings, questions, requests, temporary moods or plans, facts about anyone \
else, or anything already remembered above.

Respond exactly in this format:
<save>true or false</save>
<data>{{\"category\": \"personal_info\", \"info\": {{\"key\": \"value\"}}, \"importance\": \"low|medium|high\"}}</data>
<reason>one sentence</reason>"
    );
    OracleRequest::new(EXTRACTION_SYSTEM, prompt)
}

/// Parse an extraction answer into a fact, or return the reason for declining.
pub fn parse_extraction_answer(raw: &str) -> Result<(FactPayload, String), String> {
    let reason = extract_tag(raw, "reason").filter(|reason| !reason.is_empty());
    let declined = |fallback: &str| {
        format!(
            "oracle declined: {}",
            reason.clone().unwrap_or_else(|| fallback.to_string())
        )
    };

    match extract_flag(raw, "save") {
        Some(true) => {}
        Some(false) => return Err(declined("no reason given")),
        None => return Err(declined("missing save decision")),
    }
    let Some(data) = extract_tag(raw, "data") else {
        return Err(declined("missing data"));
    };
    let Some(fact) = parse_fact_json(&data) else {
        return Err(declined("unreadable data"));
    };
    if fact.is_empty() {
        return Err(declined("empty data"));
    }
    let reasoning = reason.unwrap_or_else(|| "oracle marked the message as durable".to_string());
    Ok((fact, reasoning))
}

fn parse_fact_json(data: &str) -> Option<FactPayload> {
    let body = data
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    let value: Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;
    let category = object
        .get("category")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|category| !category.is_empty())
        .unwrap_or(DEFAULT_CATEGORY);
    let importance = object
        .get("importance")
        .and_then(Value::as_str)
        .and_then(Importance::parse)
        .unwrap_or_default();
    let info = object
        .get("info")
        .or_else(|| object.get("data"))
        .and_then(Value::as_object)?;

    Some(FactPayload {
        category: category.to_string(),
        data: fact_data_from_json(info),
        importance,
    })
}

#[cfg(test)]
mod tests {
    use super::{Extractor, is_low_value, parse_extraction_answer};
    use crate::error::MemoryError;
    use crate::fallback::FallbackExtractor;
    use crate::model::{Importance, MemoryStore, StoreKey};
    use crate::oracle::{Oracle, OracleRequest};
    use crate::policy::MemoryPolicy;
    use async_trait::async_trait;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Canned {
        answer: Result<String, String>,
        calls: AtomicUsize,
    }

    impl Canned {
        fn ok(answer: &str) -> Self {
            Self {
                answer: Ok(answer.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                answer: Err("offline".to_string()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Oracle for Canned {
        async fn consult(&self, _request: &OracleRequest) -> Result<String, MemoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone().map_err(MemoryError::Oracle)
        }
    }

    fn empty_store() -> MemoryStore {
        MemoryStore::new(&StoreKey::new("discord", "42"), Utc::now())
    }

    #[test]
    fn low_value_filter_matches_closed_lists() {
        assert!(is_low_value("", 5));
        assert!(is_low_value("hey", 5));
        assert!(is_low_value("Thanks!", 5));
        assert!(is_low_value("what's the weather like", 5));
        assert!(is_low_value("Can you help me out", 5));
        assert!(!is_low_value("My name is Sarah", 5));
    }

    #[test]
    fn parse_answer_defaults_and_stringifies() {
        let raw = r#"Sure!
<save>TRUE</save>
<data>```json
{"info": {"age": 28, "name": "Sarah", "pet": null}, "importance": "urgent"}
```</data>
<reason>Stated their age and name</reason>"#;
        let (fact, reasoning) = parse_extraction_answer(raw).expect("fact");
        assert_eq!(fact.category, "personal_info");
        assert_eq!(fact.importance, Importance::Medium);
        assert_eq!(fact.data.len(), 2);
        assert_eq!(fact.data["age"], "28");
        assert_eq!(reasoning, "Stated their age and name");
    }

    #[test]
    fn parse_answer_declines_on_malformed_output() {
        assert!(parse_extraction_answer("no tags at all").is_err());
        assert!(parse_extraction_answer("<save>true</save><data>not json</data>").is_err());
        assert!(
            parse_extraction_answer(r#"<save>true</save><data>{"info": {}}</data>"#).is_err()
        );
        let declined =
            parse_extraction_answer("<save>false</save><reason>just a greeting</reason>")
                .expect_err("declined");
        assert_eq!(declined, "oracle declined: just a greeting");
    }

    #[tokio::test]
    async fn low_value_messages_skip_the_oracle() {
        let oracle = Canned::ok("<save>true</save>");
        let fallback = FallbackExtractor::new().expect("fallback");
        let policy = MemoryPolicy::default();
        let extractor = Extractor {
            oracle: &oracle,
            fallback: &fallback,
            policy: &policy,
        };
        let decision = extractor.decide("lol", &empty_store(), None).await;
        assert!(!decision.should_save);
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn oracle_answer_is_used_when_positive() {
        let oracle = Canned::ok(
            r#"<save>true</save><data>{"category": "personal_info", "info": {"name": "Sarah"}, "importance": "high"}</data><reason>name</reason>"#,
        );
        let fallback = FallbackExtractor::new().expect("fallback");
        let policy = MemoryPolicy::default();
        let extractor = Extractor {
            oracle: &oracle,
            fallback: &fallback,
            policy: &policy,
        };
        let decision = extractor
            .decide("My name is Sarah", &empty_store(), Some("intro"))
            .await;
        assert!(decision.should_save);
        let fact = decision.fact.expect("fact");
        assert_eq!(fact.importance, Importance::High);
        assert_eq!(fact.data["name"], "Sarah");
    }

    #[tokio::test]
    async fn oracle_failure_falls_back_to_patterns() {
        let oracle = Canned::failing();
        let fallback = FallbackExtractor::new().expect("fallback");
        let policy = MemoryPolicy::default();
        let extractor = Extractor {
            oracle: &oracle,
            fallback: &fallback,
            policy: &policy,
        };
        let decision = extractor
            .decide("I'm 28 years old", &empty_store(), None)
            .await;
        assert!(decision.should_save);
        assert_eq!(decision.fact.expect("fact").data["age"], "28");
        assert!(decision.reasoning.contains("oracle unavailable"));

        let decision = extractor
            .decide("what a lovely afternoon", &empty_store(), None)
            .await;
        assert!(!decision.should_save);
        assert!(decision.reasoning.starts_with("no durable fact"));
    }
}
