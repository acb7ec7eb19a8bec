//! Intent resolver configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Upper bound on the language-model call, in milliseconds.
    #[serde(default = "default_model_timeout_ms")]
    pub model_timeout_ms: u64,

    /// Whether the keyword matcher runs when model output is unusable.
    #[serde(default = "default_true")]
    pub fallback_enabled: bool,

    /// Maximum number of calls returned for one request (0 = unlimited).
    #[serde(default = "default_max_calls")]
    pub max_calls: usize,
}

impl ResolverConfig {
    pub fn model_timeout(&self) -> Duration {
        Duration::from_millis(self.model_timeout_ms)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            model_timeout_ms: default_model_timeout_ms(),
            fallback_enabled: true,
            max_calls: default_max_calls(),
        }
    }
}

fn default_model_timeout_ms() -> u64 {
    15_000
}

fn default_max_calls() -> usize {
    8
}

fn default_true() -> bool {
    true
}
