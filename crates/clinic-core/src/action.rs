//! Action specifications.
//!
//! An [`ActionSpec`] declares one callable operation: its unique name, a
//! human description, an ordered list of typed parameters and the handler
//! that performs it. Specs are immutable once built.

use crate::handler::ActionHandler;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// JSON type accepted by a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    /// Check whether a JSON value has this type.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }

    /// JSON Schema type keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared parameter of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

impl ParamSpec {
    /// A parameter that must be present.
    pub fn required(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: true,
            description: description.into(),
        }
    }

    /// A parameter that may be omitted.
    pub fn optional(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: false,
            description: description.into(),
        }
    }
}

/// Why an argument mapping does not satisfy a parameter schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("missing required parameter '{0}'")]
    Missing(String),

    #[error("parameter '{name}' must be of type {expected}, got {actual}")]
    WrongType {
        name: String,
        expected: ParamType,
        actual: &'static str,
    },

    #[error("unknown parameter '{0}'")]
    Unknown(String),
}

/// A registered, callable operation.
#[derive(Clone)]
pub struct ActionSpec {
    name: String,
    description: String,
    params: Vec<ParamSpec>,
    idempotent: bool,
    handler: Arc<dyn ActionHandler>,
}

impl ActionSpec {
    /// Start building a spec for `name` backed by `handler`.
    pub fn builder(name: impl Into<String>, handler: Arc<dyn ActionHandler>) -> ActionSpecBuilder {
        ActionSpecBuilder {
            spec: ActionSpec {
                name: name.into(),
                description: String::new(),
                params: Vec::new(),
                idempotent: false,
                handler,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Parameters in declaration order.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Whether repeating the call has no additional effect.
    ///
    /// Only idempotent actions are ever retried by the dispatcher.
    pub fn is_idempotent(&self) -> bool {
        self.idempotent
    }

    pub fn handler(&self) -> &Arc<dyn ActionHandler> {
        &self.handler
    }

    /// Names of the required parameters, in declaration order.
    pub fn required_params(&self) -> impl Iterator<Item = &str> {
        self.params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
    }

    /// Validate an argument mapping against the parameter schema.
    ///
    /// `null` counts as absent. Undeclared keys are rejected.
    pub fn validate_arguments(&self, arguments: &Map<String, Value>) -> Result<(), ArgumentError> {
        for param in &self.params {
            match arguments.get(&param.name) {
                None | Some(Value::Null) => {
                    if param.required {
                        return Err(ArgumentError::Missing(param.name.clone()));
                    }
                }
                Some(value) if !param.param_type.matches(value) => {
                    return Err(ArgumentError::WrongType {
                        name: param.name.clone(),
                        expected: param.param_type,
                        actual: json_type_name(value),
                    });
                }
                Some(_) => {}
            }
        }

        if let Some(unknown) = arguments.keys().find(|k| self.param(k).is_none()) {
            return Err(ArgumentError::Unknown(unknown.clone()));
        }

        Ok(())
    }

    /// The parameters rendered as a JSON Schema object.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": param.param_type.as_str(),
                    "description": param.description,
                }),
            );
        }
        let required: Vec<&str> = self.required_params().collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Name, description and input schema, as shown to a language model.
    pub fn describe(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.input_schema(),
        })
    }
}

impl fmt::Debug for ActionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("params", &self.params)
            .field("idempotent", &self.idempotent)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ActionSpec`].
pub struct ActionSpecBuilder {
    spec: ActionSpec,
}

impl ActionSpecBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.spec.description = description.into();
        self
    }

    /// Append a parameter. Declaration order is preserved.
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.spec.params.push(param);
        self
    }

    pub fn idempotent(mut self, idempotent: bool) -> Self {
        self.spec.idempotent = idempotent;
        self
    }

    pub fn build(self) -> ActionSpec {
        self.spec
    }
}

/// `[{name, description, parameters}, ...]` for `specs`, in order. This is
/// the function list a language model is prompted with.
pub fn describe_all(specs: &[ActionSpec]) -> Value {
    Value::Array(specs.iter().map(ActionSpec::describe).collect())
}

/// JSON type name of a value, for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerError;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl ActionHandler for Echo {
        async fn call(&self, arguments: &Map<String, Value>) -> Result<Value, HandlerError> {
            Ok(Value::Object(arguments.clone()))
        }
    }

    fn slots_spec() -> ActionSpec {
        ActionSpec::builder("find_available_slots", Arc::new(Echo))
            .description("Find available appointment slots for a specific specialty")
            .param(ParamSpec::required(
                "specialty",
                ParamType::String,
                "Medical specialty",
            ))
            .param(ParamSpec::required(
                "date_range_start",
                ParamType::String,
                "Start date in YYYY-MM-DD format",
            ))
            .param(ParamSpec::optional(
                "date_range_end",
                ParamType::String,
                "End date in YYYY-MM-DD format",
            ))
            .idempotent(true)
            .build()
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_accepts_required_and_optional() {
        let spec = slots_spec();
        assert!(
            spec.validate_arguments(&args(json!({
                "specialty": "cardiology",
                "date_range_start": "2025-12-23",
            })))
            .is_ok()
        );
        assert!(
            spec.validate_arguments(&args(json!({
                "specialty": "cardiology",
                "date_range_start": "2025-12-23",
                "date_range_end": null,
            })))
            .is_ok()
        );
    }

    #[test]
    fn test_rejects_missing_required() {
        let err = slots_spec()
            .validate_arguments(&args(json!({"specialty": "cardiology"})))
            .unwrap_err();
        assert_eq!(err, ArgumentError::Missing("date_range_start".into()));
    }

    #[test]
    fn test_rejects_wrong_type() {
        let err = slots_spec()
            .validate_arguments(&args(json!({
                "specialty": 7,
                "date_range_start": "2025-12-23",
            })))
            .unwrap_err();
        assert_eq!(
            err,
            ArgumentError::WrongType {
                name: "specialty".into(),
                expected: ParamType::String,
                actual: "integer",
            }
        );
    }

    #[test]
    fn test_rejects_unknown_parameter() {
        let err = slots_spec()
            .validate_arguments(&args(json!({
                "specialty": "cardiology",
                "date_range_start": "2025-12-23",
                "provider": "Dr. Reddy",
            })))
            .unwrap_err();
        assert_eq!(err, ArgumentError::Unknown("provider".into()));
    }

    #[test]
    fn test_integer_is_a_number_but_not_vice_versa() {
        assert!(ParamType::Number.matches(&json!(3)));
        assert!(ParamType::Integer.matches(&json!(3)));
        assert!(!ParamType::Integer.matches(&json!(3.5)));
    }

    #[test]
    fn test_input_schema_is_valid_json_schema() {
        let spec = slots_spec();
        let schema = spec.input_schema();
        assert_eq!(schema["required"], json!(["specialty", "date_range_start"]));

        let validator = jsonschema::draft202012::options()
            .build(&schema)
            .expect("schema must compile");

        let accepted = json!({"specialty": "cardiology", "date_range_start": "2025-12-23"});
        assert!(validator.is_valid(&accepted));
        assert!(spec.validate_arguments(&args(accepted)).is_ok());

        let rejected = json!({"specialty": "cardiology"});
        assert!(!validator.is_valid(&rejected));
        assert!(spec.validate_arguments(&args(rejected)).is_err());
    }

    #[test]
    fn test_debug_omits_handler() {
        let rendered = format!("{:?}", slots_spec());
        assert!(rendered.contains("find_available_slots"));
        assert!(rendered.contains(".."));
    }
}
