//! Handler interface implemented by the backend collaborator.
//!
//! A handler receives an argument mapping that has already been validated
//! against its [`ActionSpec`](crate::ActionSpec) and either returns a
//! structured payload or fails with a domain error. Handlers must not retry
//! internally; retry policy belongs to the dispatcher.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Domain errors a handler may report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// The referenced record does not exist (e.g. unknown patient).
    #[error("not found: {0}")]
    NotFound(String),

    /// A business rule rejected the request (e.g. slot already booked).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An argument value was well-typed but not acceptable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The backend could not be reached. The only transient variant.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Whether a retry could succeed without any change to the request.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// A callable backend operation.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Run the operation with validated arguments.
    async fn call(&self, arguments: &Map<String, Value>) -> Result<Value, HandlerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_transient() {
        assert!(HandlerError::Unavailable("timeout".into()).is_transient());
        assert!(!HandlerError::Conflict("Slot taken".into()).is_transient());
        assert!(!HandlerError::NotFound("P999".into()).is_transient());
    }

    #[test]
    fn test_error_messages_are_readable() {
        let err = HandlerError::Conflict("Slot SLOT_CAR_2025122309 is already booked".into());
        assert_eq!(
            err.to_string(),
            "conflict: Slot SLOT_CAR_2025122309 is already booked"
        );
    }
}
