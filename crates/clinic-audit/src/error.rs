//! Error types for the audit crate.

use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The ledger could not be opened for writing. Fatal at startup.
    #[error("failed to initialize audit ledger: {0}")]
    InitializationFailed(String),

    /// Failed to append an entry.
    #[error("failed to append audit entry: {0}")]
    LogFailed(String),

    /// Failed to read entries back.
    #[error("failed to read audit entries: {0}")]
    QueryFailed(String),

    /// Storage error (lock poisoning and the like).
    #[error("storage error: {0}")]
    StorageError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
