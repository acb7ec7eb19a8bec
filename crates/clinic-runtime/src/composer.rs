//! Response composer.
//!
//! Renders the final reply from the registry and the dispatch outcomes only.
//! It adds no content of its own beyond fixed wording.

use clinic_core::{DispatchMode, DispatchOutcome};
use serde_json::Value;
use std::fmt::Write;
use std::sync::Arc;

use crate::registry::ActionRegistry;

pub struct ResponseComposer {
    registry: Arc<ActionRegistry>,
}

impl ResponseComposer {
    pub fn new(registry: Arc<ActionRegistry>) -> Self {
        Self { registry }
    }

    pub fn compose(&self, request: &str, outcomes: &[DispatchOutcome]) -> String {
        if outcomes.is_empty() {
            self.clarification(request)
        } else {
            render_outcomes(outcomes)
        }
    }

    fn clarification(&self, request: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "No recognized action was found for your request: \"{}\"",
            request.trim()
        );
        out.push('\n');
        out.push_str("Available actions:\n");
        for spec in self.registry.list() {
            let required: Vec<&str> = spec.required_params().collect();
            let _ = write!(out, "- {}", spec.name());
            if !spec.description().is_empty() {
                let _ = write!(out, ": {}", spec.description());
            }
            if !required.is_empty() {
                let _ = write!(out, " (requires: {})", required.join(", "));
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str("Please restate the request with one of these actions and the details it requires.");
        out
    }
}

fn render_outcomes(outcomes: &[DispatchOutcome]) -> String {
    let mut out = String::new();

    for (idx, outcome) in outcomes.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        let arguments = Value::Object(outcome.arguments.clone());
        let _ = writeln!(out, "{}. {} {}", idx + 1, outcome.action, arguments);
        let _ = writeln!(out, "   Status: {}", status(outcome));

        match outcome.error_message() {
            Some(message) => {
                let _ = writeln!(out, "   Error: {}", message);
            }
            None if !outcome.result.is_null() => {
                out.push_str("   Result:\n");
                let pretty = serde_json::to_string_pretty(&outcome.result)
                    .unwrap_or_else(|_| outcome.result.to_string());
                for line in pretty.lines() {
                    let _ = writeln!(out, "   {}", line);
                }
            }
            None => {}
        }
    }

    out.trim_end().to_string()
}

fn status(outcome: &DispatchOutcome) -> String {
    match (outcome.success, outcome.mode, outcome.failure_kind()) {
        (true, DispatchMode::DryRun, _) => "dry run".to_string(),
        (true, DispatchMode::Live, _) => "ok".to_string(),
        (false, _, Some(kind)) => format!("failed ({})", kind),
        (false, _, None) => "failed".to_string(),
    }
}
