//! The request pipeline: record, resolve, dispatch, compose, record.

use clinic_audit::{AuditError, AuditLedger};
use clinic_core::{AssistantConfig, DispatchMode, DispatchOutcome};
use clinic_resolver::{FallbackMatcher, IntentResolver, LanguageModel, NoopModel};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::composer::ResponseComposer;
use crate::dispatcher::Dispatcher;
use crate::error::AssistantError;
use crate::registry::ActionRegistry;

/// What one request produced.
#[derive(Debug, Clone, Serialize)]
pub struct AssistantReply {
    pub session_id: Uuid,
    pub response: String,
    pub outcomes: Vec<DispatchOutcome>,
}

/// Handles clinicians' requests end to end.
///
/// `Send + Sync`; share it behind an `Arc` to serve requests from many
/// tasks. Requests are independent of each other apart from the ledger and
/// the backend state.
pub struct Assistant {
    config: AssistantConfig,
    registry: Arc<ActionRegistry>,
    resolver: IntentResolver,
    dispatcher: Dispatcher,
    composer: ResponseComposer,
    ledger: AuditLedger,
}

impl Assistant {
    pub fn builder(config: AssistantConfig) -> AssistantBuilder {
        AssistantBuilder {
            config,
            registry: ActionRegistry::new(),
            model: None,
            fallback: None,
            ledger: None,
        }
    }

    /// Handle one request.
    ///
    /// The ledger receives the request, one entry per dispatched call and the
    /// final response, all under a fresh session id. A ledger failure is the
    /// only error. Once calls have run, the error carries their outcomes and
    /// the composed response, and the response is still offered to the
    /// ledger.
    pub async fn handle(&self, request: &str) -> Result<AssistantReply, AssistantError> {
        let session_id = Uuid::new_v4();
        tracing::info!(session = %session_id, mode = %self.config.mode, "Handling request");

        self.ledger
            .log_user_request(session_id, request)
            .await
            .map_err(AssistantError::RequestNotRecorded)?;

        let calls = self.resolver.resolve(request, self.registry.list()).await;
        let (outcomes, dispatch_failure) = match self
            .dispatcher
            .execute_all(session_id, &calls, self.config.mode)
            .await
        {
            Ok(outcomes) => (outcomes, None),
            Err(e) => (e.outcomes, Some(e.source)),
        };

        let response = self.composer.compose(request, &outcomes);
        let logged = self.ledger.log_agent_response(session_id, &response).await;
        let reply = AssistantReply {
            session_id,
            response,
            outcomes,
        };

        let source = match (dispatch_failure, logged) {
            (None, Ok(_)) => {
                tracing::info!(
                    session = %session_id,
                    calls = reply.outcomes.len(),
                    failed = reply.outcomes.iter().filter(|o| !o.success).count(),
                    "Request handled"
                );
                return Ok(reply);
            }
            (Some(source), Err(e)) => {
                tracing::warn!(session = %session_id, error = %e, "Response not recorded");
                source
            }
            (Some(source), Ok(_)) | (None, Err(source)) => source,
        };

        tracing::error!(
            session = %session_id,
            calls = reply.outcomes.len(),
            error = %source,
            "Request handled but not fully recorded"
        );
        Err(AssistantError::Unrecorded { reply, source })
    }

    pub fn mode(&self) -> DispatchMode {
        self.config.mode
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &AuditLedger {
        &self.ledger
    }
}

pub struct AssistantBuilder {
    config: AssistantConfig,
    registry: ActionRegistry,
    model: Option<Arc<dyn LanguageModel>>,
    fallback: Option<Arc<dyn FallbackMatcher>>,
    ledger: Option<AuditLedger>,
}

impl AssistantBuilder {
    pub fn registry(mut self, registry: ActionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Language model to ask first. Without one, every request goes
    /// straight to the fallback matcher.
    pub fn model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn fallback(mut self, fallback: Arc<dyn FallbackMatcher>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Use an already opened ledger instead of opening one from the config.
    pub fn ledger(mut self, ledger: AuditLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Open the ledger and assemble the pipeline.
    ///
    /// Fails if the ledger cannot be opened for writing.
    pub fn build(self) -> Result<Assistant, AuditError> {
        let ledger = match self.ledger {
            Some(ledger) => ledger,
            None => AuditLedger::open(self.config.audit.clone())?,
        };

        let registry = Arc::new(self.registry);
        let model = self.model.unwrap_or_else(|| Arc::new(NoopModel));

        let mut resolver = IntentResolver::new(model, self.config.resolver.clone());
        if let Some(fallback) = self.fallback {
            resolver = resolver.with_fallback(fallback);
        }

        let dispatcher = Dispatcher::new(
            registry.clone(),
            ledger.clone(),
            self.config.dispatch.clone(),
        );
        let composer = ResponseComposer::new(registry.clone());

        tracing::info!(
            mode = %self.config.mode,
            actions = registry.len(),
            "Assistant ready"
        );

        Ok(Assistant {
            config: self.config,
            registry,
            resolver,
            dispatcher,
            composer,
            ledger,
        })
    }
}
