//! Memory service driven through the chat-model adapter and loaded config.

use persona_rs::config::{LayeredConfigOptions, PersonaConfig};
use persona_rs::memory::{FactStore, Importance, InboundMessage, StoreKey};
use persona_rs::{LlmOracle, OracleRegistry, build_service};
use persona_rs_test_utils::{FailingLLM, ScriptedLLM};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::tempdir;

/// A chat model answer is parsed into a stored record.
#[tokio::test]
async fn chat_answer_is_stored() {
    let temp = tempdir().expect("tempdir");
    let llm = ScriptedLLM::new(
        r#"Sure.
<save>true</save>
<data>{"category": "preferences", "info": {"favorite_food": "ramen"}, "importance": "medium"}</data>
<reason>Stated preference.</reason>"#,
    );
    let registry = OracleRegistry::new();
    registry.register("scripted", Arc::new(LlmOracle::new(Arc::new(llm.clone()))));
    let oracle = registry.resolve(None).expect("oracle");
    let service =
        build_service(&PersonaConfig::default(), oracle, temp.path()).expect("service");
    let key = StoreKey::new("telegram", "42");

    let outcome = service
        .remember(&key, &InboundMessage::new("ramen is my favourite food"), None)
        .await;
    assert!(outcome.saved, "{}", outcome.reasoning);

    let store = service.store().load(&key).await.expect("load");
    assert_eq!(store.records.len(), 1);
    assert_eq!(store.records[0].category, "preferences");
    assert_eq!(store.records[0].importance, Importance::Medium);
    assert!(
        llm.last_messages
            .lock()
            .iter()
            .any(|message| message.content.contains("ramen is my favourite food"))
    );
}

/// A failing chat model leaves extraction to the fallback rules.
#[tokio::test]
async fn failing_model_uses_fallback() {
    let temp = tempdir().expect("tempdir");
    let oracle = Arc::new(LlmOracle::new(Arc::new(FailingLLM::new("503"))));
    let service =
        build_service(&PersonaConfig::default(), oracle, temp.path()).expect("service");
    let key = StoreKey::new("telegram", "42");

    let outcome = service
        .remember(&key, &InboundMessage::new("I'm 28 years old"), None)
        .await;
    assert!(outcome.saved);
    assert!(outcome.reasoning.contains("oracle unavailable"));
}

/// Layered config decides where the store lives.
#[tokio::test]
async fn layered_config_sets_store_root() {
    let temp = tempdir().expect("tempdir");
    std::fs::write(
        temp.path().join("persona.json5"),
        r#"{ memory: { path: "facts", max_records: 3 }, oracle: { provider: "none" } }"#,
    )
    .expect("write config");
    let mut options = LayeredConfigOptions::new(temp.path()).with_env(BTreeMap::new());
    options.user_config_path = None;
    let config = PersonaConfig::load_layered_with_options(options)
        .expect("config")
        .config;
    let oracle = persona_rs::oracle_from_config(&config.oracle, None, None).expect("oracle");
    let service = build_service(&config, oracle, temp.path()).expect("service");

    assert_eq!(service.policy().max_records, 3);
    let outcome = service
        .remember(
            &StoreKey::new("cli", "bob"),
            &InboundMessage::new("I work as a carpenter"),
            None,
        )
        .await;
    assert!(outcome.saved, "{}", outcome.reasoning);
    assert!(temp.path().join("facts").join("cli_bob.json").exists());
}
