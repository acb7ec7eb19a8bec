use clinic_audit::AuditError;
use clinic_core::DispatchOutcome;
use thiserror::Error;

use crate::assistant::AssistantReply;

/// Errors from building or querying the action registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("action already registered: {0}")]
    DuplicateAction(String),

    #[error("unknown action: {0}")]
    UnknownAction(String),
}

/// The ledger refused a dispatch record after the call had already run.
///
/// `outcomes` holds every call dispatched so far, the unrecorded one last.
/// A live outcome in here may have changed backend state.
#[derive(Debug, Error)]
#[error("dispatch of {} not recorded: {source}", .outcomes.last().map(|o| o.action.as_str()).unwrap_or("<none>"))]
pub struct UnrecordedDispatch {
    pub outcomes: Vec<DispatchOutcome>,
    #[source]
    pub source: AuditError,
}

/// Errors from handling one request.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// The request could not be recorded, so nothing was dispatched.
    #[error("request not recorded: {0}")]
    RequestNotRecorded(#[source] AuditError),

    /// The ledger failed after dispatching. `reply` carries what was done.
    #[error("ledger failed after {} dispatched call(s): {source}", .reply.outcomes.len())]
    Unrecorded {
        reply: AssistantReply,
        #[source]
        source: AuditError,
    },
}

impl AssistantError {
    /// Outcomes of the calls that ran before the failure.
    pub fn outcomes(&self) -> &[DispatchOutcome] {
        match self {
            AssistantError::RequestNotRecorded(_) => &[],
            AssistantError::Unrecorded { reply, .. } => &reply.outcomes,
        }
    }
}
