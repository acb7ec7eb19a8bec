//! Audit ledger front end.
//!
//! Provides the main `AuditLedger` type with helper methods for recording
//! requests, dispatch outcomes and responses.

use clinic_core::{AuditConfig, DispatchOutcome};
use std::sync::Arc;
use uuid::Uuid;

use crate::entry::AuditEntry;
use crate::error::AuditError;
use crate::storage::{FileStorage, LedgerStorage, MemoryStorage};

/// The append-only audit ledger.
///
/// Cheap to clone; clones share the same storage.
#[derive(Clone)]
pub struct AuditLedger {
    config: AuditConfig,
    storage: Arc<dyn LedgerStorage>,
}

impl AuditLedger {
    /// Open the file-backed ledger described by `config`.
    pub fn open(config: AuditConfig) -> Result<Self, AuditError> {
        let storage = Arc::new(FileStorage::open(&config)?);
        Ok(Self { config, storage })
    }

    /// Create a ledger with a custom storage backend.
    pub fn with_storage(config: AuditConfig, storage: Arc<dyn LedgerStorage>) -> Self {
        Self { config, storage }
    }

    /// Create a ledger that keeps entries in memory only.
    pub fn in_memory() -> Self {
        Self {
            config: AuditConfig::default(),
            storage: Arc::new(MemoryStorage::new()),
        }
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Append an entry. Durable before this returns.
    pub async fn append(&self, entry: AuditEntry) -> Result<AuditEntry, AuditError> {
        let stored = self.storage.append(entry).await?;

        tracing::debug!(
            entry_id = %stored.entry_id,
            sequence = stored.sequence,
            event_type = %stored.event_type(),
            session = %stored.session_id,
            "Audit entry"
        );
        if self.config.stdout {
            tracing::info!("{}", stored.to_log_line());
        }

        Ok(stored)
    }

    /// Record the clinician's original request.
    pub async fn log_user_request(
        &self,
        session_id: Uuid,
        request: &str,
    ) -> Result<AuditEntry, AuditError> {
        self.append(AuditEntry::user_request(session_id, request))
            .await
    }

    /// Record one dispatch outcome.
    pub async fn log_dispatch(
        &self,
        session_id: Uuid,
        outcome: &DispatchOutcome,
    ) -> Result<AuditEntry, AuditError> {
        self.append(AuditEntry::dispatch(session_id, outcome.clone()))
            .await
    }

    /// Record the final response returned to the caller.
    pub async fn log_agent_response(
        &self,
        session_id: Uuid,
        response: &str,
    ) -> Result<AuditEntry, AuditError> {
        self.append(AuditEntry::agent_response(session_id, response))
            .await
    }

    /// Up to `limit` most recent entries, most recent last.
    pub async fn tail(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditError> {
        self.storage.tail(limit).await
    }

    /// Entries of one session among the `scan` most recent entries.
    pub async fn recent_for_session(
        &self,
        session_id: Uuid,
        scan: usize,
    ) -> Result<Vec<AuditEntry>, AuditError> {
        let mut entries = self.tail(scan).await?;
        entries.retain(|e| e.session_id == session_id);
        Ok(entries)
    }
}
