//! # clinic-runtime
//!
//! Executes the calls resolved from a clinician's request and composes the
//! reply.
//!
//! This crate provides:
//! - [`ActionRegistry`]: the callable actions and their parameter schemas
//! - [`Dispatcher`]: runs one call in dry-run or live mode and records the
//!   outcome in the audit ledger
//! - [`ResponseComposer`]: renders the reply from outcomes and the registry
//! - [`Assistant`]: the whole request pipeline
//! - [`catalog`]: the four clinical scheduling actions
//!
//! ```rust,no_run
//! use clinic_core::AssistantConfig;
//! use clinic_resolver::KeywordMatcher;
//! use clinic_runtime::{Assistant, catalog};
//! use std::sync::Arc;
//!
//! # async fn example(handlers: catalog::ClinicalHandlers) -> Result<(), Box<dyn std::error::Error>> {
//! let config = AssistantConfig::from_file("clinic.yaml")?;
//! let assistant = Assistant::builder(config)
//!     .registry(catalog::clinical_registry(handlers)?)
//!     .fallback(Arc::new(KeywordMatcher::clinical()?))
//!     .build()?;
//!
//! let reply = assistant.handle("Search for patient Ravi Kumar").await?;
//! println!("{}", reply.response);
//! # Ok(())
//! # }
//! ```

pub mod assistant;
pub mod catalog;
pub mod composer;
pub mod dispatcher;
pub mod error;
pub mod registry;

pub use assistant::{Assistant, AssistantBuilder, AssistantReply};
pub use catalog::{ClinicalHandlers, clinical_actions, clinical_registry};
pub use composer::ResponseComposer;
pub use dispatcher::Dispatcher;
pub use error::{AssistantError, RegistryError, UnrecordedDispatch};
pub use registry::ActionRegistry;
