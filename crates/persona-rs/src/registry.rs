//! Named oracle registry with a default entry.

use crate::error::PersonaError;
use log::{debug, info};
use parking_lot::RwLock;
use persona_rs_memory::Oracle;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared map of oracle ids to oracles.
///
/// Clones share the same entries. The first registered oracle becomes the
/// default until `set_default` picks another.
#[derive(Clone, Default)]
pub struct OracleRegistry {
    oracles: Arc<RwLock<HashMap<String, Arc<dyn Oracle>>>>,
    default_id: Arc<RwLock<Option<String>>>,
}

impl OracleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an oracle under `id`.
    pub fn register(&self, id: impl Into<String>, oracle: Arc<dyn Oracle>) {
        let id = id.into();
        let replaced = self.oracles.write().insert(id.clone(), oracle).is_some();
        let mut default_id = self.default_id.write();
        if default_id.is_none() {
            *default_id = Some(id.clone());
        }
        info!("oracle registered (id={}, replaced={})", id, replaced);
    }

    /// Fetch a registered oracle.
    pub fn get(&self, id: &str) -> Result<Arc<dyn Oracle>, PersonaError> {
        self.oracles
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| PersonaError::UnknownOracle(id.to_string()))
    }

    /// Resolve an optional id, falling back to the default.
    pub fn resolve(&self, id: Option<&str>) -> Result<Arc<dyn Oracle>, PersonaError> {
        match id {
            Some(id) => self.get(id),
            None => {
                let default_id = self
                    .default_id
                    .read()
                    .clone()
                    .ok_or(PersonaError::NoDefaultOracle)?;
                self.get(&default_id)
            }
        }
    }

    pub fn default_id(&self) -> Option<String> {
        self.default_id.read().clone()
    }

    /// Make an already registered oracle the default.
    pub fn set_default(&self, id: &str) -> Result<(), PersonaError> {
        if !self.oracles.read().contains_key(id) {
            return Err(PersonaError::UnknownOracle(id.to_string()));
        }
        debug!("setting default oracle (id={})", id);
        *self.default_id.write() = Some(id.to_string());
        Ok(())
    }

    /// Registered ids in sorted order.
    pub fn list_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.oracles.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::OracleRegistry;
    use crate::error::PersonaError;
    use persona_rs_memory::{NoOracle, Oracle, OracleRequest};
    use persona_rs_test_utils::FixedOracle;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[tokio::test]
    async fn first_registration_becomes_default() {
        let registry = OracleRegistry::new();
        registry.register("scripted", Arc::new(FixedOracle::new("hello")));
        registry.register("offline", Arc::new(NoOracle));

        assert_eq!(registry.default_id().as_deref(), Some("scripted"));
        let oracle = registry.resolve(None).expect("default");
        let answer = oracle
            .consult(&OracleRequest::new("sys", "prompt"))
            .await
            .expect("answer");
        assert_eq!(answer, "hello");
        assert_eq!(registry.list_ids(), vec!["offline", "scripted"]);
    }

    #[test]
    fn set_default_requires_registration() {
        let registry = OracleRegistry::new();
        registry.register("offline", Arc::new(NoOracle));
        assert!(matches!(
            registry.set_default("missing"),
            Err(PersonaError::UnknownOracle(_))
        ));
        registry.register("scripted", Arc::new(FixedOracle::new("hi")));
        registry.set_default("scripted").expect("set default");
        assert_eq!(registry.default_id().as_deref(), Some("scripted"));
    }

    #[test]
    fn empty_registry_has_no_default() {
        let registry = OracleRegistry::new();
        assert!(matches!(
            registry.resolve(None),
            Err(PersonaError::NoDefaultOracle)
        ));
        assert!(matches!(
            registry.resolve(Some("x")),
            Err(PersonaError::UnknownOracle(_))
        ));
    }

    #[test]
    fn clones_share_entries() {
        let registry = OracleRegistry::new();
        let clone = registry.clone();
        clone.register("offline", Arc::new(NoOracle));
        assert!(registry.get("offline").is_ok());
    }
}
