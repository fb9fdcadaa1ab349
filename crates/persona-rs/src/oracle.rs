//! Oracle adapter over `autoagents_llm` chat providers.

use async_trait::async_trait;
use autoagents_llm::LLMProvider;
use autoagents_llm::backends::openai::OpenAI;
use autoagents_llm::builder::LLMBuilder;
use autoagents_llm::chat::{ChatMessage, ChatProvider, ChatRole, MessageType};
use log::{debug, info};
use persona_rs_config::OracleConfig;
use persona_rs_memory::{MemoryError, NoOracle, Oracle, OracleRequest};
use std::sync::Arc;

use crate::error::PersonaError;

/// Oracle that sends each request as a system + user chat exchange.
#[derive(Clone)]
pub struct LlmOracle {
    llm: Arc<dyn LLMProvider>,
}

impl LlmOracle {
    pub fn new(llm: Arc<dyn LLMProvider>) -> Self {
        Self { llm }
    }

    /// Build the chat messages for a request.
    fn messages(request: &OracleRequest) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if !request.system.trim().is_empty() {
            messages.push(ChatMessage {
                role: ChatRole::System,
                message_type: MessageType::Text,
                content: request.system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: ChatRole::User,
            message_type: MessageType::Text,
            content: request.prompt.clone(),
        });
        messages
    }
}

#[async_trait]
impl Oracle for LlmOracle {
    async fn consult(&self, request: &OracleRequest) -> Result<String, MemoryError> {
        let messages = Self::messages(request);
        debug!(
            "consulting llm oracle (messages={}, prompt_len={})",
            messages.len(),
            request.prompt.len()
        );
        let response = self
            .llm
            .chat_with_tools(&messages, None, None)
            .await
            .map_err(|err| MemoryError::Oracle(err.to_string()))?;
        match response.text() {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(MemoryError::Oracle("empty response".to_string())),
        }
    }
}

/// Build the oracle described by `config`.
///
/// `openai` requires `api_key`; `none` yields an oracle that always fails so
/// extraction runs on the fallback rules alone.
pub fn oracle_from_config(
    config: &OracleConfig,
    model_override: Option<&str>,
    api_key: Option<String>,
) -> Result<Arc<dyn Oracle>, PersonaError> {
    match config.provider.as_str() {
        "none" => {
            info!("oracle disabled by config (provider=none)");
            Ok(Arc::new(NoOracle))
        }
        "openai" => {
            let api_key =
                api_key.ok_or_else(|| PersonaError::MissingApiKey(config.api_key_env.clone()))?;
            let model = model_override.unwrap_or(&config.model);
            info!("building openai oracle (model={})", model);
            let llm: Arc<dyn LLMProvider> = LLMBuilder::<OpenAI>::new()
                .api_key(api_key)
                .model(model.to_string())
                .build()
                .map_err(|err| PersonaError::Llm(err.to_string()))?;
            Ok(Arc::new(LlmOracle::new(llm)))
        }
        other => Err(PersonaError::UnsupportedProvider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::{LlmOracle, oracle_from_config};
    use crate::error::PersonaError;
    use autoagents_llm::chat::ChatRole;
    use persona_rs_config::OracleConfig;
    use persona_rs_memory::{Oracle, OracleRequest};
    use persona_rs_test_utils::{FailingLLM, ScriptedLLM};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[tokio::test]
    async fn sends_system_and_user_messages() {
        let llm = ScriptedLLM::new("<save>false</save>");
        let oracle = LlmOracle::new(Arc::new(llm.clone()));

        let answer = oracle
            .consult(&OracleRequest::new("be terse", "My name is Sarah"))
            .await
            .expect("answer");
        assert_eq!(answer, "<save>false</save>");

        let sent = llm.last_messages.lock().clone();
        assert_eq!(sent.len(), 2);
        assert!(matches!(sent[0].role, ChatRole::System));
        assert_eq!(sent[0].content, "be terse");
        assert!(matches!(sent[1].role, ChatRole::User));
        assert_eq!(sent[1].content, "My name is Sarah");
    }

    #[tokio::test]
    async fn blank_system_instruction_is_skipped() {
        let llm = ScriptedLLM::new("ok");
        let oracle = LlmOracle::new(Arc::new(llm.clone()));
        oracle
            .consult(&OracleRequest::new("  ", "hello"))
            .await
            .expect("answer");
        assert_eq!(llm.last_messages.lock().len(), 1);
    }

    #[tokio::test]
    async fn empty_text_is_an_error() {
        let oracle = LlmOracle::new(Arc::new(ScriptedLLM::silent()));
        let err = oracle
            .consult(&OracleRequest::new("sys", "prompt"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("empty response"));
    }

    #[tokio::test]
    async fn provider_errors_become_oracle_errors() {
        let oracle = LlmOracle::new(Arc::new(FailingLLM::new("rate limited")));
        let err = oracle
            .consult(&OracleRequest::new("sys", "prompt"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[tokio::test]
    async fn provider_none_builds_offline_oracle() {
        let config = OracleConfig {
            provider: "none".to_string(),
            ..OracleConfig::default()
        };
        let oracle = oracle_from_config(&config, None, None).expect("oracle");
        assert!(
            oracle
                .consult(&OracleRequest::new("sys", "prompt"))
                .await
                .is_err()
        );
    }

    #[test]
    fn openai_without_key_is_rejected() {
        let err = match oracle_from_config(&OracleConfig::default(), None, None) {
            Ok(_) => panic!("expected missing key"),
            Err(err) => err,
        };
        assert!(matches!(err, PersonaError::MissingApiKey(ref var) if var == "OPENAI_API_KEY"));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = OracleConfig {
            provider: "carrier-pigeon".to_string(),
            ..OracleConfig::default()
        };
        assert!(matches!(
            oracle_from_config(&config, None, None),
            Err(PersonaError::UnsupportedProvider(_))
        ));
    }
}
