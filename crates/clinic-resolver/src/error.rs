//! Resolution errors.
//!
//! None of these escape `IntentResolver::resolve`; they are logged and the
//! offending candidate (or the whole model answer) is dropped.

use clinic_core::ArgumentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The candidate names an action that is not registered.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// The candidate's arguments do not satisfy the action's parameters.
    #[error("invalid arguments for {action}: {reason}")]
    InvalidArgument { action: String, reason: String },

    /// The language model failed or timed out.
    #[error("language model unavailable: {0}")]
    Unavailable(String),

    /// The completion held no usable structured block.
    #[error("unparsable model output: {0}")]
    Unparsable(String),

    /// A keyword rule pattern does not compile.
    #[error("invalid keyword pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl ResolveError {
    pub(crate) fn invalid_argument(action: &str, err: ArgumentError) -> Self {
        Self::InvalidArgument {
            action: action.to_string(),
            reason: err.to_string(),
        }
    }
}
