//! Deterministic pattern extractor used when the oracle declines or fails.

use crate::error::MemoryError;
use crate::extraction::is_low_value;
use crate::model::{DEFAULT_CATEGORY, FactPayload, Importance, MemoryRecord};
use crate::redundancy::RedundancyRules;
use regex::{Captures, Regex};

/// Words that end a captured phrase.
const BREAK_WORDS: &[&str] = &[
    "and", "but", "with", "since", "because", "so", "now", "which", "who", "where", "when",
    "though", "although", "or",
];

const LOCATION_STOPWORDS: &[&str] = &[
    "the", "a", "an", "my", "your", "his", "her", "there", "here",
];

/// Capitalized words that follow "I'm" without being a name.
const NOT_NAMES: &[&str] = &[
    "back", "fine", "glad", "going", "good", "happy", "here", "just", "not", "okay", "really",
    "so", "sorry", "still", "sure", "tired", "very",
];

const NOT_INTERESTS: &[&str] = &["you", "it", "that", "this", "them", "him", "her", "to"];

const IM: &str = r"i(?:['’]?m| am)";

type Rule = fn(&FallbackExtractor, &str) -> Option<FactPayload>;

/// Ordered rule-based fact extractor.
///
/// Rules run as age, origin or residence, occupation, name, preference or
/// interest, dietary or health, then family. The first rule that yields a fact
/// the store does not already hold wins.
#[derive(Debug, Clone)]
pub struct FallbackExtractor {
    min_message_chars: usize,
    rules: RedundancyRules,
    age: Vec<Regex>,
    location: Regex,
    occupation: Vec<Regex>,
    name: Vec<Regex>,
    name_cased: Regex,
    favorite: Regex,
    feeling: Regex,
    allergy: Regex,
    diet: Regex,
    restriction: Regex,
    children: Regex,
    status: Regex,
    partner: Regex,
}

impl FallbackExtractor {
    /// Compile the rule set.
    pub fn new() -> Result<Self, MemoryError> {
        Ok(Self {
            min_message_chars: 5,
            rules: RedundancyRules::default(),
            age: vec![
                compile(&format!(r"(?i)\b{IM} (\d{{1,2}}) years? old\b"))?,
                compile(r"(?i)\bmy age is (\d{1,2})\b")?,
                compile(r"(?i)\b(\d{1,2}) years? old\b")?,
                compile(&format!(r"(?i)\b{IM} (\d{{1,2}})\b"))?,
            ],
            location: compile(&format!(
                r"(?i)\b(?:{IM} (?:originally )?from|i live in|my home is in|i was born in|i grew up in) ([a-z][a-z ]*)"
            ))?,
            occupation: vec![
                compile(r"(?i)\bi work as (?:an? )?([a-z][a-z ]*)")?,
                compile(&format!(r"(?i)\b{IM} an? ([a-z]+(?: [a-z]+)?) (?:at|for)\b"))?,
                compile(r"(?i)\bmy job is (?:an? )?([a-z][a-z ]*)")?,
                compile(&format!(
                    r"(?i)\b{IM} (?:an? )?(teacher|engineer|doctor|nurse|developer|programmer|student|designer|lawyer|artist|writer|chef|manager|accountant|scientist)\b"
                ))?,
            ],
            name: vec![
                compile(r"(?i)\bmy name is ([a-z][a-z'-]*)")?,
                compile(r"(?i)\bcall me ([a-z][a-z'-]*)")?,
            ],
            name_cased: compile(r"(?:^|[^A-Za-z])[Ii](?:['’]m| am) ([A-Z][A-Za-z'-]+)")?,
            favorite: compile(r"(?i)\bmy fav(?:ou?rite) ([a-z]+(?: [a-z]+)?) is ([^.!?,;]+)")?,
            feeling: compile(r"(?i)\bi (love|hate|prefer|like|enjoy) ([^.!?,;]+)")?,
            allergy: compile(&format!(r"(?i)\b{IM} allergic to ([^.!?,;]+)"))?,
            diet: compile(&format!(r"(?i)\b{IM} (?:an? )?(vegetarian|vegan)\b"))?,
            restriction: compile(
                r"(?i)\bi (?:don['’]?t|can['’]?t|cannot) (?:eat|drink) ([^.!?,;]+)",
            )?,
            children: compile(r"(?i)\bi have (\d+) (?:kids?|children|child)\b")?,
            status: compile(&format!(
                r"(?i)\b{IM} (married|single|divorced|widowed|engaged)\b"
            ))?,
            partner: compile(r"(?i)\bmy (wife|husband|partner|boyfriend|girlfriend|fiance|fiancee)\b")?,
        })
    }

    /// Override the minimum message length (in chars).
    pub fn with_min_message_chars(mut self, min_message_chars: usize) -> Self {
        self.min_message_chars = min_message_chars;
        self
    }

    /// Override the key link table used for the known-value check.
    pub fn with_rules(mut self, rules: RedundancyRules) -> Self {
        self.rules = rules;
        self
    }

    /// Extract the first fact not already present in `records`.
    pub fn extract(&self, message: &str, records: &[MemoryRecord]) -> Option<FactPayload> {
        if is_low_value(message, self.min_message_chars) {
            return None;
        }
        let ordered: [Rule; 7] = [
            Self::age,
            Self::location,
            Self::occupation,
            Self::name,
            Self::preference,
            Self::health,
            Self::family,
        ];
        ordered
            .iter()
            .filter_map(|rule| rule(self, message))
            .find(|fact| {
                !fact
                    .data
                    .iter()
                    .any(|(key, value)| self.rules.is_known_value(records, key, value))
            })
    }

    fn age(&self, message: &str) -> Option<FactPayload> {
        let value = first_capture(&self.age, message)?;
        Some(personal("age", value, Importance::High))
    }

    fn location(&self, message: &str) -> Option<FactPayload> {
        let caps = self.location.captures(message)?;
        let words = clip_words(caps.get(1)?.as_str(), 4);
        let words = words
            .iter()
            .skip_while(|word| matches!(word.to_lowercase().as_str(), "the" | "a" | "an"))
            .cloned()
            .collect::<Vec<_>>();
        let place = words.join(" ");
        if place.is_empty() || LOCATION_STOPWORDS.contains(&place.to_lowercase().as_str()) {
            return None;
        }
        Some(personal("location", title_case(&place), Importance::High))
    }

    fn occupation(&self, message: &str) -> Option<FactPayload> {
        let value = first_capture(&self.occupation, message)?;
        let value = clip_words(&value, 4).join(" ").to_lowercase();
        if value.is_empty() {
            return None;
        }
        Some(FactPayload::new("professional", Importance::High).with_fact("occupation", value))
    }

    fn name(&self, message: &str) -> Option<FactPayload> {
        let value = first_capture(&self.name, message)
            .map(|value| title_case(&value))
            .or_else(|| {
                let caps = self.name_cased.captures(message)?;
                let value = caps.get(1)?.as_str();
                if NOT_NAMES.contains(&value.to_lowercase().as_str()) {
                    return None;
                }
                Some(value.to_string())
            })?;
        Some(personal("name", value, Importance::High))
    }

    fn preference(&self, message: &str) -> Option<FactPayload> {
        if let Some(caps) = self.favorite.captures(message) {
            let subject = capture(&caps, 1)?.to_lowercase();
            let choice = clip_words(&capture(&caps, 2)?, 6).join(" ");
            if !choice.is_empty() {
                return Some(
                    FactPayload::new("preferences", Importance::Medium)
                        .with_fact("preference", format!("{subject}: {choice}")),
                );
            }
        }
        let caps = self.feeling.captures(message)?;
        let verb = capture(&caps, 1)?.to_lowercase();
        let object = clip_words(&capture(&caps, 2)?, 6).join(" ").to_lowercase();
        let first = object.split_whitespace().next().unwrap_or_default();
        if object.is_empty() || NOT_INTERESTS.contains(&first) {
            return None;
        }
        let key = if verb == "hate" { "dislike" } else { "interest" };
        Some(FactPayload::new("preferences", Importance::Medium).with_fact(key, object))
    }

    fn health(&self, message: &str) -> Option<FactPayload> {
        if let Some(caps) = self.allergy.captures(message) {
            let allergen = clip_words(&capture(&caps, 1)?, 4).join(" ").to_lowercase();
            if !allergen.is_empty() {
                return Some(health_fact("allergy", allergen));
            }
        }
        if let Some(caps) = self.diet.captures(message) {
            return Some(health_fact("dietary_preference", capture(&caps, 1)?.to_lowercase()));
        }
        let caps = self.restriction.captures(message)?;
        let item = clip_words(&capture(&caps, 1)?, 4).join(" ").to_lowercase();
        if item.is_empty() {
            return None;
        }
        Some(health_fact("dietary_restriction", item))
    }

    fn family(&self, message: &str) -> Option<FactPayload> {
        if let Some(caps) = self.children.captures(message) {
            let count = capture(&caps, 1)?;
            return Some(
                FactPayload::new("family", Importance::High)
                    .with_fact("children", format!("has {count} children")),
            );
        }
        let status = self
            .status
            .captures(message)
            .and_then(|caps| capture(&caps, 1))
            .map(|status| status.to_lowercase())
            .or_else(|| {
                let caps = self.partner.captures(message)?;
                Some(format!("has a {}", capture(&caps, 1)?.to_lowercase()))
            })?;
        Some(
            FactPayload::new("family", Importance::Medium)
                .with_fact("relationship_status", status),
        )
    }
}

fn compile(pattern: &str) -> Result<Regex, MemoryError> {
    Regex::new(pattern).map_err(|err| MemoryError::Regex(err.to_string()))
}

fn capture(caps: &Captures<'_>, index: usize) -> Option<String> {
    caps.get(index)
        .map(|m| m.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

fn first_capture(patterns: &[Regex], message: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|regex| regex.captures(message).and_then(|caps| capture(&caps, 1)))
}

fn personal(key: &str, value: impl Into<String>, importance: Importance) -> FactPayload {
    FactPayload::new(DEFAULT_CATEGORY, importance).with_fact(key, value)
}

fn health_fact(key: &str, value: String) -> FactPayload {
    FactPayload::new("health", Importance::High).with_fact(key, value)
}

/// Leading words of `phrase`, stopping at a break word.
fn clip_words(phrase: &str, max_words: usize) -> Vec<String> {
    phrase
        .split_whitespace()
        .take_while(|word| !BREAK_WORDS.contains(&word.to_lowercase().as_str()))
        .take(max_words)
        .map(str::to_string)
        .collect()
}

fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::FallbackExtractor;
    use crate::model::{FactPayload, Importance, MemoryRecord};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn extractor() -> FallbackExtractor {
        FallbackExtractor::new().expect("rules compile")
    }

    fn extract(message: &str) -> Option<FactPayload> {
        extractor().extract(message, &[])
    }

    fn single(message: &str) -> (String, String, String, Importance) {
        let fact = extract(message).expect("fact");
        let (key, value) = fact.data.iter().next().expect("entry");
        (
            fact.category.clone(),
            key.clone(),
            value.clone(),
            fact.importance,
        )
    }

    #[test]
    fn extracts_age_name_and_location() {
        assert_eq!(
            single("I'm 28 years old"),
            (
                "personal_info".into(),
                "age".into(),
                "28".into(),
                Importance::High
            )
        );
        assert_eq!(single("My name is sarah").2, "Sarah");
        assert_eq!(single("Hello there, I'm Priya!").2, "Priya");
        assert_eq!(single("Please call me Max").2, "Max");
        assert_eq!(
            single("I grew up in new york and moved later").2,
            "New York"
        );
    }

    #[test]
    fn location_stopwords_do_not_fire() {
        assert_eq!(extract("well I live in there"), None);
    }

    #[test]
    fn extracts_occupation_preferences_health_and_family() {
        assert_eq!(
            single("I work as a software engineer"),
            (
                "professional".into(),
                "occupation".into(),
                "software engineer".into(),
                Importance::High
            )
        );
        assert_eq!(single("my favorite color is blue").2, "color: blue");
        assert_eq!(single("I enjoy hiking in the alps").1, "interest");
        assert_eq!(single("I hate mornings").1, "dislike");
        assert_eq!(single("I'm allergic to peanuts").2, "peanuts");
        assert_eq!(single("honestly I'm vegan these days").2, "vegan");
        assert_eq!(single("I can't eat gluten").1, "dietary_restriction");
        assert_eq!(
            single("I have 2 kids at home"),
            (
                "family".into(),
                "children".into(),
                "has 2 children".into(),
                Importance::High
            )
        );
        assert_eq!(single("I'm married since 2019").2, "married");
        assert_eq!(single("Went out with my wife").2, "has a wife");
    }

    #[test]
    fn earlier_rules_take_priority() {
        let fact = extract("My name is Sarah and I'm 28 years old").expect("fact");
        assert_eq!(fact.data.get("age").map(String::as_str), Some("28"));
    }

    #[test]
    fn known_values_fall_through_to_later_rules() {
        let records = vec![MemoryRecord::from_fact(
            FactPayload::new("personal_info", Importance::High).with_fact("age", "28"),
            "User message: I'm 28",
            Utc::now(),
        )];
        let fact = extractor()
            .extract("My name is Sarah and I'm 28 years old", &records)
            .expect("fact");
        assert_eq!(fact.data.get("name").map(String::as_str), Some("Sarah"));

        let records = vec![MemoryRecord::from_fact(
            FactPayload::new("travel", Importance::Medium).with_fact("current_location", "Paris"),
            "User message: in Paris",
            Utc::now(),
        )];
        assert_eq!(extractor().extract("I live in Paris", &records), None);
    }

    #[test]
    fn low_value_and_plain_messages_yield_nothing() {
        assert_eq!(extract("ok"), None);
        assert_eq!(extract("can you tell me my age, I'm 30"), None);
        assert_eq!(extract("what a lovely afternoon it was"), None);
        assert_eq!(extract("I'm Going to the shop"), None);
    }
}
