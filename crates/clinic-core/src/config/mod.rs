//! Configuration types for the clinic dispatcher.
//!
//! Configuration is loaded from a single YAML file (e.g. `clinic.yaml`):
//!
//! ```yaml
//! mode: dry_run            # or "live"
//! audit:
//!   directory: logs
//!   file_prefix: audit
//!   fsync: true
//! resolver:
//!   model_timeout_ms: 15000
//!   fallback_enabled: true
//!   max_calls: 8
//! dispatch:
//!   max_idempotent_retries: 0
//! ```
//!
//! Every field has a default, so an empty document is a valid configuration.

pub mod audit;
pub mod dispatch;
pub mod resolver;

use crate::DispatchMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use audit::AuditConfig;
pub use dispatch::DispatchConfig;
pub use resolver::ResolverConfig;

/// Complete assistant configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Execution mode for dispatched calls. Defaults to dry run.
    #[serde(default)]
    pub mode: DispatchMode,

    /// Audit ledger settings.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Intent resolver settings.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Dispatcher settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AssistantConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to `()`, not to a map.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration and resolve the audit directory relative to the
    /// file's own directory.
    pub fn load_with_context(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_file(path)?;

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        if config.audit.directory.is_relative() {
            config.audit.directory = base_dir.join(&config.audit.directory);
        }

        Ok(config)
    }

    /// Reject values that would make the assistant unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolver.model_timeout_ms == 0 {
            return Err(ConfigError::Config(
                "resolver.model_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.audit.file_prefix.trim().is_empty() {
            return Err(ConfigError::Config(
                "audit.file_prefix must not be empty".to_string(),
            ));
        }
        if self
            .audit
            .file_prefix
            .contains(|c: char| c == '/' || c == '\\')
        {
            return Err(ConfigError::Config(format!(
                "audit.file_prefix '{}' must not contain path separators",
                self.audit.file_prefix
            )));
        }
        Ok(())
    }
}
