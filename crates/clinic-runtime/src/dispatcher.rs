//! Dispatcher: executes (or dry-runs) resolved calls and records each
//! outcome in the audit ledger.

use chrono::{DateTime, Utc};
use clinic_audit::AuditLedger;
use clinic_core::{
    ActionSpec, DispatchConfig, DispatchMode, DispatchOutcome, FailureKind, ResolvedCall,
};
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::UnrecordedDispatch;
use crate::registry::ActionRegistry;

pub struct Dispatcher {
    registry: Arc<ActionRegistry>,
    ledger: AuditLedger,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(registry: Arc<ActionRegistry>, ledger: AuditLedger, config: DispatchConfig) -> Self {
        Self {
            registry,
            ledger,
            config,
        }
    }

    /// Execute one call and record its outcome.
    ///
    /// Unknown actions, invalid arguments and handler errors all become
    /// failed outcomes. The only error returned is a ledger failure, and it
    /// still carries the outcome since a live call has already run.
    pub async fn execute(
        &self,
        session_id: Uuid,
        call: &ResolvedCall,
        mode: DispatchMode,
    ) -> Result<DispatchOutcome, UnrecordedDispatch> {
        let outcome = self.run(call, mode).await;

        if outcome.success {
            tracing::info!(
                session = %session_id,
                action = %outcome.action,
                mode = %outcome.mode,
                attempts = outcome.attempts,
                duration_ms = outcome.duration_ms(),
                "Dispatched call"
            );
        } else {
            tracing::warn!(
                session = %session_id,
                action = %outcome.action,
                mode = %outcome.mode,
                error = outcome.error_message().unwrap_or_default(),
                "Dispatched call failed"
            );
        }

        match self.ledger.log_dispatch(session_id, &outcome).await {
            Ok(_) => Ok(outcome),
            Err(source) => {
                tracing::error!(
                    session = %session_id,
                    action = %outcome.action,
                    mode = %outcome.mode,
                    success = outcome.success,
                    error = %source,
                    "Dispatch outcome not recorded"
                );
                Err(UnrecordedDispatch {
                    outcomes: vec![outcome],
                    source,
                })
            }
        }
    }

    /// Execute calls strictly in order; each sees the effects of the
    /// previous ones. Stops at the first ledger failure, whose error holds
    /// the outcomes of every call run so far.
    pub async fn execute_all(
        &self,
        session_id: Uuid,
        calls: &[ResolvedCall],
        mode: DispatchMode,
    ) -> Result<Vec<DispatchOutcome>, UnrecordedDispatch> {
        let mut outcomes = Vec::with_capacity(calls.len());
        for call in calls {
            match self.execute(session_id, call, mode).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(mut e) => {
                    outcomes.append(&mut e.outcomes);
                    e.outcomes = outcomes;
                    return Err(e);
                }
            }
        }
        Ok(outcomes)
    }

    async fn run(&self, call: &ResolvedCall, mode: DispatchMode) -> DispatchOutcome {
        let started_at = Utc::now();

        let spec = match self.registry.lookup(&call.action) {
            Ok(spec) => spec,
            Err(e) => {
                return DispatchOutcome::failed(
                    call,
                    mode,
                    FailureKind::UnknownAction,
                    e.to_string(),
                    0,
                    started_at,
                );
            }
        };

        if let Err(e) = spec.validate_arguments(&call.arguments) {
            return DispatchOutcome::failed(
                call,
                mode,
                FailureKind::InvalidArgument,
                e.to_string(),
                0,
                started_at,
            );
        }

        match mode {
            DispatchMode::DryRun => {
                DispatchOutcome::succeeded(call, mode, dry_run_payload(call), 0, started_at)
            }
            DispatchMode::Live => self.invoke(spec, call, started_at).await,
        }
    }

    async fn invoke(
        &self,
        spec: &ActionSpec,
        call: &ResolvedCall,
        started_at: DateTime<Utc>,
    ) -> DispatchOutcome {
        let max_attempts = if spec.is_idempotent() {
            self.config.max_idempotent_retries.saturating_add(1)
        } else {
            1
        };

        let mut attempts = 0;
        loop {
            attempts += 1;
            match spec.handler().call(&call.arguments).await {
                Ok(result) => {
                    return DispatchOutcome::succeeded(
                        call,
                        DispatchMode::Live,
                        result,
                        attempts,
                        started_at,
                    );
                }
                Err(e) if e.is_transient() && attempts < max_attempts => {
                    tracing::warn!(
                        action = %call.action,
                        attempt = attempts,
                        error = %e,
                        "Handler unavailable, retrying"
                    );
                }
                Err(e) => {
                    return DispatchOutcome::failed(
                        call,
                        DispatchMode::Live,
                        FailureKind::HandlerFailed,
                        e.to_string(),
                        attempts,
                        started_at,
                    );
                }
            }
        }
    }
}

fn dry_run_payload(call: &ResolvedCall) -> Value {
    let arguments = Value::Object(call.arguments.clone());
    json!({
        "status": "DRY_RUN",
        "message": format!("Would run {} with {}", call.action, arguments),
        "action": call.action,
        "arguments": arguments,
    })
}
