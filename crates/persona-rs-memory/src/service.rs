//! Fail-soft entry points composing extraction, storage and retrieval.

use crate::error::MemoryError;
use crate::extraction::Extractor;
use crate::fallback::FallbackExtractor;
use crate::model::{InboundMessage, StoreKey, source_excerpt};
use crate::oracle::Oracle;
use crate::policy::MemoryPolicy;
use crate::provider::{FactStore, UpsertOutcome};
use crate::retrieval::{RetrievalOutcome, Retriever};
use log::{debug, warn};
use std::sync::Arc;

/// Result of `MemoryService::remember`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RememberOutcome {
    /// Whether a fact was appended or consolidated.
    pub saved: bool,
    pub reasoning: String,
}

impl RememberOutcome {
    fn not_saved(reasoning: impl Into<String>) -> Self {
        Self {
            saved: false,
            reasoning: reasoning.into(),
        }
    }
}

/// Memory subsystem facade used by the reply pipeline.
#[derive(Clone)]
pub struct MemoryService {
    oracle: Arc<dyn Oracle>,
    store: Arc<dyn FactStore>,
    policy: MemoryPolicy,
    fallback: FallbackExtractor,
}

impl MemoryService {
    /// Build a service with the default fallback rules.
    pub fn new(
        oracle: Arc<dyn Oracle>,
        store: Arc<dyn FactStore>,
        policy: MemoryPolicy,
    ) -> Result<Self, MemoryError> {
        let fallback = FallbackExtractor::new()?.with_min_message_chars(policy.min_message_chars);
        Ok(Self {
            oracle,
            store,
            policy,
            fallback,
        })
    }

    /// Replace the fallback extractor.
    pub fn with_fallback(mut self, fallback: FallbackExtractor) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn policy(&self) -> &MemoryPolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<dyn FactStore> {
        &self.store
    }

    /// Extract and persist a durable fact from `message`, if it has one.
    pub async fn remember(
        &self,
        key: &StoreKey,
        message: &InboundMessage,
        context: Option<&str>,
    ) -> RememberOutcome {
        debug!(
            "remember message (platform={}, user_id={}, message_id={})",
            key.platform,
            key.user_id,
            message.message_id.as_deref().unwrap_or("-")
        );
        let store = match self.store.load(key).await {
            Ok(store) => store,
            Err(err) => {
                warn!("memory load failed (key={key}, error={err})");
                return RememberOutcome::not_saved(format!("load error: {err}"));
            }
        };

        let extractor = Extractor {
            oracle: self.oracle.as_ref(),
            fallback: &self.fallback,
            policy: &self.policy,
        };
        let decision = extractor.decide(&message.content, &store, context).await;
        let fact = match decision.fact {
            Some(fact) if decision.should_save => fact,
            _ => return RememberOutcome::not_saved(decision.reasoning),
        };

        let source = source_excerpt(&message.content, self.policy.source_excerpt_chars);
        match self.store.upsert(key, fact, &source).await {
            Ok(UpsertOutcome::Rejected) => RememberOutcome::not_saved(format!(
                "rejected as conversational metadata; {}",
                decision.reasoning
            )),
            Ok(outcome) => RememberOutcome {
                saved: outcome.is_saved(),
                reasoning: decision.reasoning,
            },
            Err(err) => {
                warn!("memory save failed (key={key}, error={err})");
                RememberOutcome::not_saved(format!("save error: {err}"))
            }
        }
    }

    /// Select stored facts relevant to `message`.
    pub async fn recall(
        &self,
        key: &StoreKey,
        message: &InboundMessage,
        context: Option<&str>,
    ) -> RetrievalOutcome {
        let store = match self.store.snapshot(key).await {
            Ok(store) => store,
            Err(err) => {
                warn!("memory load failed (key={key}, error={err})");
                return RetrievalOutcome::empty(format!("load error: {err}"));
            }
        };
        let retriever = Retriever {
            oracle: self.oracle.as_ref(),
            policy: &self.policy,
        };
        retriever.retrieve(&message.content, &store, context).await
    }
}
