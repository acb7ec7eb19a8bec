//! # clinic-resolver
//!
//! Turns a clinician's free-text request into an ordered list of validated
//! function calls.
//!
//! Resolution asks a [`LanguageModel`] first and parses the calls out of its
//! completion. When the model fails, times out or answers in prose, a
//! [`FallbackMatcher`] proposes calls from keywords instead. Every candidate
//! is checked against the action's parameters before it is returned; invalid
//! candidates are logged and dropped.
//!
//! ```rust,no_run
//! use clinic_core::ResolverConfig;
//! use clinic_resolver::{IntentResolver, KeywordMatcher, NoopModel};
//! use std::sync::Arc;
//!
//! # async fn example(actions: Vec<clinic_core::ActionSpec>) -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = IntentResolver::new(Arc::new(NoopModel), ResolverConfig::default())
//!     .with_fallback(Arc::new(KeywordMatcher::clinical()?));
//!
//! let calls = resolver.resolve("Search for patient Ravi Kumar", &actions).await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod fallback;
pub mod model;
pub mod parse;
pub mod prompt;
pub mod resolver;

pub use error::ResolveError;
pub use fallback::{Extractor, FallbackMatcher, KeywordMatcher, KeywordRule};
pub use model::{LanguageModel, NoopModel, StaticModel};
pub use parse::{CandidateCall, parse_completion};
pub use prompt::build_prompt;
pub use resolver::{IntentResolver, validate_candidate};
