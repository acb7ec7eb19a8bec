use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// Action schemas and the handler interface
pub mod action;
pub mod handler;

// Configuration shared across all clinic crates
pub mod config;

pub use action::{
    ActionSpec, ActionSpecBuilder, ArgumentError, ParamSpec, ParamType, describe_all,
};
pub use config::{AssistantConfig, AuditConfig, ConfigError, DispatchConfig, ResolverConfig};
pub use handler::{ActionHandler, HandlerError};

/// Whether dispatched calls reach the real handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Resolve and record, but never invoke the handler.
    #[default]
    DryRun,
    /// Invoke the handler.
    Live,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DryRun => write!(f, "DRY_RUN"),
            Self::Live => write!(f, "LIVE"),
        }
    }
}

/// Where a resolved call came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallSource {
    /// Parsed from structured language-model output.
    Model,
    /// Produced by the deterministic keyword matcher.
    Fallback,
}

/// One schema-validated action invocation, produced per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCall {
    pub action: String,
    pub arguments: Map<String, Value>,
    pub source: CallSource,
}

impl ResolvedCall {
    pub fn new(action: impl Into<String>, arguments: Map<String, Value>, source: CallSource) -> Self {
        Self {
            action: action.into(),
            arguments,
            source,
        }
    }

    /// Same action with the same arguments, regardless of source.
    pub fn same_invocation(&self, other: &ResolvedCall) -> bool {
        self.action == other.action && self.arguments == other.arguments
    }
}

/// Why a dispatch did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The action is not in the registry.
    UnknownAction,
    /// The arguments do not satisfy the action's schema.
    InvalidArgument,
    /// The handler ran and reported an error.
    HandlerFailed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAction => write!(f, "unknown_action"),
            Self::InvalidArgument => write!(f, "invalid_argument"),
            Self::HandlerFailed => write!(f, "handler_failed"),
        }
    }
}

/// Typed failure attached to an unsuccessful [`DispatchOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// The result of executing one [`ResolvedCall`]. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub action: String,
    pub arguments: Map<String, Value>,
    pub mode: DispatchMode,
    pub success: bool,

    /// Handler payload (live) or dry-run placeholder.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub result: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<OutcomeFailure>,

    /// Handler invocations made; zero for dry runs and rejected calls.
    pub attempts: u32,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DispatchOutcome {
    /// A successful outcome finishing now.
    pub fn succeeded(
        call: &ResolvedCall,
        mode: DispatchMode,
        result: Value,
        attempts: u32,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            action: call.action.clone(),
            arguments: call.arguments.clone(),
            mode,
            success: true,
            result,
            failure: None,
            attempts,
            started_at,
            finished_at: finished_at(started_at),
        }
    }

    /// A failed outcome finishing now.
    pub fn failed(
        call: &ResolvedCall,
        mode: DispatchMode,
        kind: FailureKind,
        message: impl Into<String>,
        attempts: u32,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            action: call.action.clone(),
            arguments: call.arguments.clone(),
            mode,
            success: false,
            result: Value::Null,
            failure: Some(OutcomeFailure {
                kind,
                message: message.into(),
            }),
            attempts,
            started_at,
            finished_at: finished_at(started_at),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure.as_ref().map(|f| f.kind)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.message.as_str())
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}

// Wall clocks may step backwards; an outcome never ends before it starts.
fn finished_at(started_at: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(started_at)
}
