//! # clinic-audit
//!
//! Append-only audit ledger for the clinic dispatcher.
//!
//! This crate provides functionality for:
//! - Recording every user request, every dispatched call and every final
//!   response, each stamped with a sequence number and a monotonic timestamp
//! - Storing entries as JSON Lines, one segment file per UTC day
//! - Reading back the most recent N entries
//!
//! ## Entry Types
//!
//! | Event Type | Description |
//! |------------|-------------|
//! | `UserRequest` | Free-text request received |
//! | `Dispatch` | One call executed or dry-run, with its outcome |
//! | `AgentResponse` | Composed response returned to the caller |
//!
//! ## Guarantees
//!
//! - `append` returns only after the line is written, flushed and (by
//!   default) synced to disk.
//! - Appends are serialized by a mutex: concurrent requests never interleave
//!   bytes and sequence numbers follow append order.
//! - A ledger that cannot be opened for writing is an error at startup.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use clinic_audit::AuditLedger;
//! use clinic_core::AuditConfig;
//! use uuid::Uuid;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = AuditLedger::open(AuditConfig::default())?;
//!
//! let session = Uuid::new_v4();
//! ledger.log_user_request(session, "Search for patient Ravi Kumar").await?;
//! ledger.log_agent_response(session, "No recognized action.").await?;
//!
//! for entry in ledger.tail(10).await? {
//!     println!("{}", entry.to_log_line());
//! }
//! # Ok(())
//! # }
//! ```

pub mod entry;
pub mod error;
pub mod ledger;
pub mod storage;

pub use entry::{AuditEntry, AuditEvent, AuditEventType};
pub use error::AuditError;
pub use ledger::AuditLedger;
pub use storage::{FileStorage, LedgerStorage, MemoryStorage};
