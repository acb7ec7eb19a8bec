//! Turning free text into validated calls.

use clinic_core::{ActionSpec, CallSource, ResolvedCall, ResolverConfig};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::ResolveError;
use crate::fallback::FallbackMatcher;
use crate::model::LanguageModel;
use crate::parse::{CandidateCall, parse_completion};
use crate::prompt::build_prompt;

/// Resolves a request into an ordered list of schema-valid calls.
///
/// The language model is asked first. When it fails, times out or answers
/// without a structured block, the fallback matcher (if any) takes over.
pub struct IntentResolver {
    model: Arc<dyn LanguageModel>,
    fallback: Option<Arc<dyn FallbackMatcher>>,
    config: ResolverConfig,
}

impl IntentResolver {
    pub fn new(model: Arc<dyn LanguageModel>, config: ResolverConfig) -> Self {
        Self {
            model,
            fallback: None,
            config,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackMatcher>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve `text` against the `available` actions.
    ///
    /// Never fails: every problem is logged and results in fewer (possibly
    /// zero) calls.
    pub async fn resolve(&self, text: &str, available: &[ActionSpec]) -> Vec<ResolvedCall> {
        let text = text.trim();
        if text.is_empty() || available.is_empty() {
            tracing::debug!("Nothing to resolve");
            return Vec::new();
        }

        let (candidates, source) = match self.ask_model(text, available).await {
            Ok(candidates) => (candidates, CallSource::Model),
            Err(reason) => {
                tracing::warn!(error = %reason, "Model output unusable, using keyword fallback");
                (self.fallback_candidates(text, available), CallSource::Fallback)
            }
        };

        let mut calls: Vec<ResolvedCall> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let name = candidate.name.clone();
            match validate_candidate(candidate, source, available) {
                Ok(call) => {
                    if calls.iter().any(|seen| seen.same_invocation(&call)) {
                        tracing::debug!(action = %call.action, "Dropping duplicate call");
                        continue;
                    }
                    calls.push(call);
                }
                Err(e) => {
                    tracing::warn!(action = %name, error = %e, "Dropping candidate call");
                }
            }
        }

        if self.config.max_calls > 0 && calls.len() > self.config.max_calls {
            tracing::warn!(
                resolved = calls.len(),
                max_calls = self.config.max_calls,
                "Too many calls resolved, truncating"
            );
            calls.truncate(self.config.max_calls);
        }

        tracing::debug!(
            calls = calls.len(),
            source = ?source,
            "Request resolved"
        );
        calls
    }

    async fn ask_model(
        &self,
        text: &str,
        available: &[ActionSpec],
    ) -> Result<Vec<CandidateCall>, ResolveError> {
        let prompt = build_prompt(text, available);

        let completion =
            match tokio::time::timeout(self.config.model_timeout(), self.model.complete(&prompt))
                .await
            {
                Ok(Ok(completion)) => completion,
                Ok(Err(e)) => return Err(ResolveError::Unavailable(e.to_string())),
                Err(_) => {
                    return Err(ResolveError::Unavailable(format!(
                        "timed out after {}ms",
                        self.config.model_timeout_ms
                    )));
                }
            };

        parse_completion(&completion)
    }

    fn fallback_candidates(&self, text: &str, available: &[ActionSpec]) -> Vec<CandidateCall> {
        match &self.fallback {
            Some(matcher) if self.config.fallback_enabled => matcher.match_text(text, available),
            _ => {
                tracing::debug!("Keyword fallback disabled");
                Vec::new()
            }
        }
    }
}

/// Check a candidate against the available actions.
///
/// Nulls are stripped first, so a null optional parameter counts as absent
/// while a null required parameter is reported missing.
pub fn validate_candidate(
    candidate: CandidateCall,
    source: CallSource,
    available: &[ActionSpec],
) -> Result<ResolvedCall, ResolveError> {
    let spec = available
        .iter()
        .find(|spec| spec.name() == candidate.name)
        .ok_or_else(|| ResolveError::UnknownAction(candidate.name.clone()))?;

    let mut arguments: Map<String, Value> = match candidate.arguments {
        Value::Object(map) => map,
        other => {
            return Err(ResolveError::InvalidArgument {
                action: candidate.name,
                reason: format!(
                    "arguments must be an object, got {}",
                    clinic_core::action::json_type_name(&other)
                ),
            });
        }
    };
    arguments.retain(|_, value| !value.is_null());

    spec.validate_arguments(&arguments)
        .map_err(|e| ResolveError::invalid_argument(spec.name(), e))?;

    Ok(ResolvedCall::new(spec.name(), arguments, source))
}
