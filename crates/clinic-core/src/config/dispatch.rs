//! Dispatcher configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Extra attempts allowed for idempotent actions whose handler reported
    /// the backend as unavailable. Non-idempotent actions are never retried.
    #[serde(default)]
    pub max_idempotent_retries: u32,
}
