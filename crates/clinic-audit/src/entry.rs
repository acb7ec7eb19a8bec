//! Audit entry types.
//!
//! Every request produces one `user_request` entry, zero or more `dispatch`
//! entries in execution order, and exactly one `agent_response` entry, all
//! sharing the request's session id.

use chrono::{DateTime, Utc};
use clinic_core::DispatchOutcome;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of audit event, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    UserRequest,
    Dispatch,
    AgentResponse,
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserRequest => write!(f, "USER_REQUEST"),
            Self::Dispatch => write!(f, "DISPATCH"),
            Self::AgentResponse => write!(f, "AGENT_RESPONSE"),
        }
    }
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// The clinician's original free-text request.
    UserRequest { request: String },
    /// One executed (or dry-run) call.
    Dispatch { outcome: DispatchOutcome },
    /// The final composed response returned to the caller.
    AgentResponse { response: String },
}

impl AuditEvent {
    pub fn event_type(&self) -> AuditEventType {
        match self {
            Self::UserRequest { .. } => AuditEventType::UserRequest,
            Self::Dispatch { .. } => AuditEventType::Dispatch,
            Self::AgentResponse { .. } => AuditEventType::AgentResponse,
        }
    }
}

/// One ledger record.
///
/// `sequence` and `recorded_at` are assigned by the storage at append time;
/// values set by the caller are overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry ID.
    pub entry_id: Uuid,

    /// Position in the ledger, starting at 1.
    pub sequence: u64,

    /// When the entry was appended. Never earlier than the previous entry.
    pub recorded_at: DateTime<Utc>,

    /// Groups all entries of one request.
    pub session_id: Uuid,

    pub event: AuditEvent,
}

impl AuditEntry {
    /// Create an unstamped entry.
    pub fn new(session_id: Uuid, event: AuditEvent) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            sequence: 0,
            recorded_at: Utc::now(),
            session_id,
            event,
        }
    }

    pub fn user_request(session_id: Uuid, request: impl Into<String>) -> Self {
        Self::new(
            session_id,
            AuditEvent::UserRequest {
                request: request.into(),
            },
        )
    }

    pub fn dispatch(session_id: Uuid, outcome: DispatchOutcome) -> Self {
        Self::new(session_id, AuditEvent::Dispatch { outcome })
    }

    pub fn agent_response(session_id: Uuid, response: impl Into<String>) -> Self {
        Self::new(
            session_id,
            AuditEvent::AgentResponse {
                response: response.into(),
            },
        )
    }

    pub fn event_type(&self) -> AuditEventType {
        self.event.event_type()
    }

    /// The dispatch outcome, if this is a dispatch entry.
    pub fn outcome(&self) -> Option<&DispatchOutcome> {
        match &self.event {
            AuditEvent::Dispatch { outcome } => Some(outcome),
            _ => None,
        }
    }

    /// Format the entry as a human-readable log line.
    ///
    /// Format: `[timestamp] #seq EVENT_TYPE session=... <details>`
    pub fn to_log_line(&self) -> String {
        let mut line = format!(
            "[{}] #{} {} session={}",
            self.recorded_at.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.sequence,
            self.event_type(),
            self.session_id,
        );

        match &self.event {
            AuditEvent::UserRequest { request } => {
                line.push_str(&format!(" request=\"{}\"", preview(request)));
            }
            AuditEvent::Dispatch { outcome } => {
                line.push_str(&format!(
                    " action={} mode={} success={}",
                    outcome.action, outcome.mode, outcome.success
                ));
                let args = serde_json::Value::Object(outcome.arguments.clone());
                line.push_str(&format!(" arguments={}", args));
                if let Some(failure) = &outcome.failure {
                    line.push_str(&format!(
                        " failure={} error=\"{}\"",
                        failure.kind,
                        preview(&failure.message)
                    ));
                }
                line.push_str(&format!(" duration_ms={}", outcome.duration_ms()));
            }
            AuditEvent::AgentResponse { response } => {
                line.push_str(&format!(" response=\"{}\"", preview(response)));
            }
        }

        line
    }
}

// Truncate long text for console output, on a char boundary.
fn preview(text: &str) -> String {
    const MAX_CHARS: usize = 100;
    let flat = text.replace('\n', " ").replace('"', "'");
    match flat.char_indices().nth(MAX_CHARS) {
        Some((idx, _)) => format!("{}...", &flat[..idx]),
        None => flat,
    }
}
