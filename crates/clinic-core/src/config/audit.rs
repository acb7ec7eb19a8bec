//! Audit ledger configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the audit ledger.
///
/// There is deliberately no `enabled` switch: every request is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Directory holding the daily ledger segments.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Segment file prefix; files are named `<prefix>_YYYYMMDD.jsonl`.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Whether to `fsync` each appended entry before returning.
    #[serde(default = "default_true")]
    pub fsync: bool,

    /// Whether to mirror each entry to the `info` log as a readable line.
    #[serde(default)]
    pub stdout: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            file_prefix: default_file_prefix(),
            fsync: true,
            stdout: false,
        }
    }
}

fn default_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_file_prefix() -> String {
    "audit".to_string()
}

fn default_true() -> bool {
    true
}
