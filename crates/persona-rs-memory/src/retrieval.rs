//! Relevance-ranked retrieval of stored facts for a new conversational turn.

use crate::model::MemoryStore;
use crate::oracle::{Oracle, OracleRequest, consult_with_timeout};
use crate::policy::MemoryPolicy;
use crate::tags::{extract_flag, extract_section, extract_tag, extract_tags};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fmt;

const IDENTITY_WORDS: &[&str] = &["name", "call me", "who am i", "what am i"];
const HELP_WORDS: &[&str] = &["help", "tell me", "explain", "show me", "what is", "how to"];
const RECOMMENDATION_WORDS: &[&str] = &[
    "recommend",
    "suggest",
    "should i",
    "what should",
    "any ideas",
];

const RETRIEVAL_SYSTEM: &str = "You select which remembered facts about a user matter for \
the reply to their latest message. Score every fact and answer only in the requested format.";

/// Usage tier derived from a 0-10 relevance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelevanceTier {
    High,
    Moderate,
    Contextual,
    NotRelevant,
}

impl RelevanceTier {
    /// Map a score to its tier. Scores above 10 count as 10.
    pub fn from_score(score: u8) -> Self {
        match score {
            9.. => RelevanceTier::High,
            6..=8 => RelevanceTier::Moderate,
            3..=5 => RelevanceTier::Contextual,
            _ => RelevanceTier::NotRelevant,
        }
    }

    fn heading(self) -> &'static str {
        match self {
            RelevanceTier::High => "HIGH RELEVANCE (use directly in the reply)",
            RelevanceTier::Moderate => "MODERATE RELEVANCE (weave in if it fits naturally)",
            RelevanceTier::Contextual => "CONTEXTUAL (background only, do not mention unprompted)",
            RelevanceTier::NotRelevant => "NOT RELEVANT",
        }
    }
}

impl fmt::Display for RelevanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RelevanceTier::High => "HIGH",
            RelevanceTier::Moderate => "MODERATE",
            RelevanceTier::Contextual => "CONTEXTUAL",
            RelevanceTier::NotRelevant => "NOT_RELEVANT",
        };
        f.write_str(label)
    }
}

/// One fact the oracle scored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelevantMemory {
    pub fact: String,
    pub score: u8,
    pub tier: RelevanceTier,
    /// Why the fact matters for this message.
    pub why: Option<String>,
    /// How the reply should use it.
    pub how: Option<String>,
}

/// Retrieval result handed to reply generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalOutcome {
    /// Guidance block, absent when nothing relevant was found.
    pub context: Option<String>,
    pub reasoning: String,
}

impl RetrievalOutcome {
    pub fn empty(reasoning: impl Into<String>) -> Self {
        Self {
            context: None,
            reasoning: reasoning.into(),
        }
    }
}

/// Coarse intent of the incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageIntent {
    Identity,
    Personal,
    Recommendation,
    ProblemSolving,
    Casual,
}

impl MessageIntent {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageIntent::Identity => "identity",
            MessageIntent::Personal => "personal",
            MessageIntent::Recommendation => "recommendation",
            MessageIntent::ProblemSolving => "problem_solving",
            MessageIntent::Casual => "casual",
        }
    }
}

/// Surface cues used to classify intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntentCues {
    pub question: bool,
    pub identity: bool,
    pub help_seeking: bool,
    pub casual: bool,
}

impl IntentCues {
    /// Detect cues in a message.
    pub fn detect(message: &str) -> Self {
        let lowered = message.to_lowercase();
        let question = lowered.contains('?');
        let word_count = lowered.split_whitespace().count();
        Self {
            question,
            identity: IDENTITY_WORDS.iter().any(|word| lowered.contains(word)),
            help_seeking: HELP_WORDS.iter().any(|word| lowered.contains(word)),
            casual: word_count < 10
                && !question
                && !lowered.contains("help")
                && !lowered.contains("explain"),
        }
    }

    /// Classify intent from the detected cues.
    pub fn intent(&self, message: &str) -> MessageIntent {
        let lowered = message.to_lowercase();
        if self.identity {
            MessageIntent::Identity
        } else if RECOMMENDATION_WORDS
            .iter()
            .any(|word| lowered.contains(word))
        {
            MessageIntent::Recommendation
        } else if self.help_seeking {
            MessageIntent::ProblemSolving
        } else if self.casual {
            MessageIntent::Casual
        } else {
            MessageIntent::Personal
        }
    }
}

/// Oracle-backed relevance retriever.
pub struct Retriever<'a> {
    pub oracle: &'a dyn Oracle,
    pub policy: &'a MemoryPolicy,
}

impl Retriever<'_> {
    /// Select and rank stored facts relevant to `message`. Never fails.
    pub async fn retrieve(
        &self,
        message: &str,
        store: &MemoryStore,
        context: Option<&str>,
    ) -> RetrievalOutcome {
        if store.is_empty() {
            return RetrievalOutcome::empty("no stored information");
        }
        let request = build_retrieval_request(message, store, context, self.policy);
        let raw = match consult_with_timeout(self.oracle, &request, self.policy.oracle_timeout)
            .await
        {
            Ok(raw) => raw,
            Err(err) => {
                warn!("retrieval oracle unavailable (error={err})");
                return RetrievalOutcome::empty(format!("retrieval failed: {err}"));
            }
        };
        let outcome = parse_retrieval_answer(&raw);
        debug!(
            "memory retrieval finished (records={}, has_context={})",
            store.records.len(),
            outcome.context.is_some()
        );
        outcome
    }
}

/// Build the oracle request for a retrieval call.
pub fn build_retrieval_request(
    message: &str,
    store: &MemoryStore,
    context: Option<&str>,
    policy: &MemoryPolicy,
) -> OracleRequest {
    let mut by_category: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for record in &store.records {
        by_category
            .entry(record.category.as_str())
            .or_default()
            .push(record.describe());
    }
    let facts = by_category
        .iter()
        .map(|(category, facts)| {
            let lines = facts
                .iter()
                .map(|fact| format!("  - {fact}"))
                .collect::<Vec<_>>()
                .join("\n");
            format!("{category}:\n{lines}")
        })
        .collect::<Vec<_>>()
        .join("\n");
    let recent = store
        .most_recent(policy.temporal_context_len)
        .into_iter()
        .map(|record| {
            format!(
                "- {} ({})",
                record.describe(),
                record.timestamp.format("%Y-%m-%d")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let cues = IntentCues::detect(message);
    let intent = cues.intent(message);
    let context = context
        .filter(|context| !context.trim().is_empty())
        .map(|context| format!("\nConversation context:\n{context}\n"))
        .unwrap_or_default();

    let prompt = format!(
        "Latest message:\n{message}\n{context}
Message intent: {intent} (question={question}, identity={identity}, help_seeking={help}, casual={casual})

Everything remembered about this user:
{facts}

Most recently updated:
{recent}

Score every remembered fact from 0 to 10 for this message:
- HIGH (9-10): directly answers or shapes the reply
- MODERATE (6-8): useful for personalising the reply
- CONTEXTUAL (3-5): background the reply should be consistent with
- NOT_RELEVANT (0-2): leave out
For every fact scoring 3 or more explain why it matters and how to use it.

Respond exactly in this format:
<hasRelevantMemories>true or false</hasRelevantMemories>
<memory><fact>the fact</fact><score>0-10</score><why>reason</why><how>usage</how></memory>
(repeat <memory> for each fact scoring 3 or more)
<reasoning>short explanation</reasoning>",
        intent = intent.as_str(),
        question = cues.question,
        identity = cues.identity,
        help = cues.help_seeking,
        casual = cues.casual,
    );
    OracleRequest::new(RETRIEVAL_SYSTEM, prompt)
}

/// Parse a retrieval answer into a guidance block.
pub fn parse_retrieval_answer(raw: &str) -> RetrievalOutcome {
    let reasoning = extract_tag(raw, "reasoning")
        .or_else(|| extract_section(raw, "REASONING"))
        .filter(|reasoning| !reasoning.is_empty());

    let Some(has_relevant) = extract_flag(raw, "hasRelevantMemories") else {
        return RetrievalOutcome::empty("retrieval failed: missing relevance flag");
    };
    let reasoning = reasoning.unwrap_or_else(|| "no reasoning given".to_string());
    if !has_relevant {
        return RetrievalOutcome::empty(reasoning);
    }

    let memories = extract_tags(raw, "memory")
        .iter()
        .filter_map(|entry| parse_memory_entry(entry))
        .filter(|memory| memory.tier != RelevanceTier::NotRelevant)
        .collect::<Vec<_>>();
    if !memories.is_empty() {
        return RetrievalOutcome {
            context: Some(render_guidance(&memories)),
            reasoning,
        };
    }
    let context = extract_tag(raw, "memoryContext").filter(|context| !context.is_empty());
    RetrievalOutcome { context, reasoning }
}

fn parse_memory_entry(entry: &str) -> Option<RelevantMemory> {
    let fact = extract_tag(entry, "fact").filter(|fact| !fact.is_empty())?;
    let score = parse_score(&extract_tag(entry, "score")?)?;
    Some(RelevantMemory {
        fact,
        score,
        tier: RelevanceTier::from_score(score),
        why: extract_tag(entry, "why").filter(|why| !why.is_empty()),
        how: extract_tag(entry, "how").filter(|how| !how.is_empty()),
    })
}

/// Leading number of a score string such as `9`, `7.5` or `8/10`, capped at 10.
fn parse_score(raw: &str) -> Option<u8> {
    let number = raw
        .trim()
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .next()?;
    let value = number.parse::<f64>().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value.round().min(10.0) as u8)
}

/// Render tiers HIGH, MODERATE, CONTEXTUAL in order, highest score first.
pub fn render_guidance(memories: &[RelevantMemory]) -> String {
    let mut sections = Vec::new();
    for tier in [
        RelevanceTier::High,
        RelevanceTier::Moderate,
        RelevanceTier::Contextual,
    ] {
        let mut in_tier = memories
            .iter()
            .filter(|memory| memory.tier == tier)
            .collect::<Vec<_>>();
        if in_tier.is_empty() {
            continue;
        }
        in_tier.sort_by(|a, b| b.score.cmp(&a.score));
        let mut lines = vec![format!("{}:", tier.heading())];
        for memory in in_tier {
            lines.push(format!("- {} (score {})", memory.fact, memory.score));
            if let Some(why) = &memory.why {
                lines.push(format!("  why: {why}"));
            }
            if let Some(how) = &memory.how {
                lines.push(format!("  how: {how}"));
            }
        }
        sections.push(lines.join("\n"));
    }
    sections.join("\n\n")
}
