//! Action registry.
//!
//! Holds every callable action with its parameter schema. Populated at
//! startup and shared read-only afterwards.

use clinic_core::{ActionSpec, describe_all};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::RegistryError;

/// Registry of available actions, kept in registration order.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    actions: Vec<ActionSpec>,
    index: HashMap<String, usize>,
}

impl ActionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from specs, in order.
    pub fn from_specs(specs: impl IntoIterator<Item = ActionSpec>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for spec in specs {
            registry.register(spec)?;
        }
        Ok(registry)
    }

    /// Register an action. Names are unique.
    pub fn register(&mut self, spec: ActionSpec) -> Result<(), RegistryError> {
        if self.index.contains_key(spec.name()) {
            return Err(RegistryError::DuplicateAction(spec.name().to_string()));
        }
        tracing::debug!(action = %spec.name(), "Registered action");
        self.index.insert(spec.name().to_string(), self.actions.len());
        self.actions.push(spec);
        Ok(())
    }

    /// Get an action by name.
    pub fn lookup(&self, name: &str) -> Result<&ActionSpec, RegistryError> {
        self.index
            .get(name)
            .map(|&idx| &self.actions[idx])
            .ok_or_else(|| RegistryError::UnknownAction(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All actions, in registration order.
    pub fn list(&self) -> &[ActionSpec] {
        &self.actions
    }

    /// Action names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// The function list the resolver prompts the model with, see
    /// [`clinic_core::describe_all`].
    pub fn schemas_json(&self) -> Value {
        describe_all(&self.actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clinic_core::{ActionHandler, HandlerError, ParamSpec, ParamType};
    use serde_json::Map;
    use std::sync::Arc;

    struct Nothing;

    #[async_trait]
    impl ActionHandler for Nothing {
        async fn call(&self, _arguments: &Map<String, Value>) -> Result<Value, HandlerError> {
            Ok(Value::Null)
        }
    }

    fn create_test_action(name: &str) -> ActionSpec {
        ActionSpec::builder(name, Arc::new(Nothing))
            .description(format!("Test action: {}", name))
            .param(ParamSpec::required("query", ParamType::String, "What to look for"))
            .build()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ActionRegistry::new();
        registry.register(create_test_action("search_patient")).unwrap();

        assert!(registry.lookup("search_patient").is_ok());
        assert_eq!(
            registry.lookup("nonexistent").unwrap_err(),
            RegistryError::UnknownAction("nonexistent".to_string())
        );
    }

    #[test]
    fn test_duplicate_is_rejected() {
        let mut registry = ActionRegistry::new();
        registry.register(create_test_action("search_patient")).unwrap();

        let err = registry
            .register(create_test_action("search_patient"))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateAction("search_patient".to_string()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_list_keeps_registration_order() {
        let registry = ActionRegistry::from_specs(
            ["zeta", "alpha", "mid"].into_iter().map(create_test_action),
        )
        .unwrap();

        assert_eq!(registry.names(), vec!["zeta", "alpha", "mid"]);
        let listed: Vec<_> = registry.list().iter().map(|a| a.name()).collect();
        assert_eq!(listed, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_schemas_json() {
        let registry = ActionRegistry::from_specs([create_test_action("search_patient")]).unwrap();
        let schemas = registry.schemas_json();

        assert_eq!(schemas[0]["name"], "search_patient");
        assert_eq!(schemas[0]["parameters"]["required"][0], "query");
    }

    #[test]
    fn test_schemas_json_is_what_the_model_is_prompted_with() {
        let registry = ActionRegistry::from_specs(
            ["search_patient", "book_appointment"].into_iter().map(create_test_action),
        )
        .unwrap();

        let prompt = clinic_resolver::build_prompt("Search for patient P001", registry.list());
        let functions = serde_json::to_string_pretty(&registry.schemas_json()).unwrap();
        assert!(prompt.contains(&functions));
    }

    #[test]
    fn test_empty_registry() {
        let registry = ActionRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.names().is_empty());
    }
}
