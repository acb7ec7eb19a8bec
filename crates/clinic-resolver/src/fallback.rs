//! Deterministic keyword matching, used when the language model is
//! unavailable or answers without a structured block.
//!
//! Each rule ties an action to trigger patterns and to extractors for its
//! arguments. An extractor that finds nothing leaves its argument out; the
//! resolver then drops the candidate if that argument was required.

use chrono::{Datelike, Days, NaiveDate, Utc};
use clinic_core::ActionSpec;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::ResolveError;
use crate::parse::CandidateCall;

/// Proposes calls for a request without a language model.
pub trait FallbackMatcher: Send + Sync {
    /// Candidates for `text`, in the order of `available`.
    fn match_text(&self, text: &str, available: &[ActionSpec]) -> Vec<CandidateCall>;
}

/// Specialty stems and the canonical specialty name they map to.
const SPECIALTIES: &[(&str, &str)] = &[
    ("cardio", "cardiology"),
    ("ortho", "orthopedics"),
    ("dermat", "dermatology"),
    ("neuro", "neurology"),
    ("pediatric", "pediatrics"),
    ("paediatric", "pediatrics"),
    ("oncolog", "oncology"),
    ("general practice", "general"),
];

/// How one argument value is pulled out of the request text.
#[derive(Debug, Clone, PartialEq)]
pub enum Extractor {
    /// Patient id if present, otherwise the name following "patient".
    PatientQuery,
    /// A patient id such as `P001`.
    PatientId,
    /// A specialty from the vocabulary, or `default` when none is named.
    Specialty { default: Option<String> },
    /// First ISO date, else a relative date, else the reference date.
    StartDate,
    /// Second ISO date, else the end of "next week".
    EndDate,
    /// A slot id such as `SLOT_CAR_2025122309`.
    SlotId,
}

/// Keyword rule for one action.
#[derive(Debug, Clone)]
pub struct KeywordRule {
    action: String,
    triggers: Vec<Regex>,
    arguments: Vec<(String, Extractor)>,
}

impl KeywordRule {
    /// Create a rule; trigger patterns are compiled case-insensitively.
    pub fn new(action: impl Into<String>, triggers: &[&str]) -> Result<Self, ResolveError> {
        let mut compiled = Vec::with_capacity(triggers.len());
        for pattern in triggers {
            match Regex::new(&format!("(?i){}", pattern)) {
                Ok(re) => compiled.push(re),
                Err(e) => {
                    tracing::warn!(pattern = %pattern, error = %e, "Invalid trigger pattern");
                    return Err(e.into());
                }
            }
        }
        Ok(Self {
            action: action.into(),
            triggers: compiled,
            arguments: Vec::new(),
        })
    }

    pub fn argument(mut self, name: impl Into<String>, extractor: Extractor) -> Self {
        self.arguments.push((name.into(), extractor));
        self
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    fn triggered_by(&self, text: &str) -> bool {
        self.triggers.iter().any(|re| re.is_match(text))
    }
}

struct Patterns {
    patient_id: Regex,
    patient_name: Regex,
    slot_id: Regex,
    iso_date: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, ResolveError> {
        Ok(Self {
            patient_id: Regex::new(r"\bP\d{3,}\b")?,
            patient_name: Regex::new(
                r"(?i:\bpatient)\s+(?i:named\s+|called\s+)?([A-Z][\w'-]*(?:\s+[A-Z][\w'-]*)*)",
            )?,
            slot_id: Regex::new(r"\bSLOT_[A-Z]{3}_\d{10}\b")?,
            iso_date: Regex::new(r"\b\d{4}-\d{2}-\d{2}\b")?,
        })
    }
}

/// The shipped `FallbackMatcher`: explicit per-action keyword rules.
pub struct KeywordMatcher {
    rules: Vec<KeywordRule>,
    patterns: Patterns,
    reference_date: Option<NaiveDate>,
}

impl KeywordMatcher {
    pub fn new(rules: Vec<KeywordRule>) -> Result<Self, ResolveError> {
        Ok(Self {
            rules,
            patterns: Patterns::compile()?,
            reference_date: None,
        })
    }

    /// Rules for the four clinical scheduling actions.
    pub fn clinical() -> Result<Self, ResolveError> {
        let rules = vec![
            KeywordRule::new(
                "search_patient",
                &[r"\bsearch\b", r"\bfind\s+(?:the\s+)?patient\b", r"\blook\s*up\b"],
            )?
            .argument("query", Extractor::PatientQuery),
            KeywordRule::new(
                "check_insurance_eligibility",
                &[r"\binsurance\b", r"\beligib", r"\bcoverage\b"],
            )?
            .argument("patient_id", Extractor::PatientId)
            .argument("service_type", Extractor::Specialty { default: None }),
            KeywordRule::new(
                "find_available_slots",
                &[r"\bslots?\b", r"\bavailab", r"\bopenings?\b"],
            )?
            .argument(
                "specialty",
                Extractor::Specialty {
                    default: Some("general".to_string()),
                },
            )
            .argument("date_range_start", Extractor::StartDate)
            .argument("date_range_end", Extractor::EndDate),
            KeywordRule::new("book_appointment", &[r"\bbook", r"\bschedul", r"\breserve\b"])?
                .argument("patient_id", Extractor::PatientId)
                .argument("slot_id", Extractor::SlotId),
        ];
        Self::new(rules)
    }

    /// Resolve relative dates against `date` instead of today (UTC).
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Utc::now().date_naive())
    }

    fn extract(&self, extractor: &Extractor, text: &str) -> Option<String> {
        match extractor {
            Extractor::PatientQuery => self
                .patient_id(text)
                .or_else(|| self.patient_name(text)),
            Extractor::PatientId => self.patient_id(text),
            Extractor::Specialty { default } => specialty(text).or_else(|| default.clone()),
            Extractor::StartDate => self
                .iso_dates(text)
                .into_iter()
                .next()
                .or_else(|| self.relative_start(text))
                .or_else(|| Some(self.today()))
                .map(|d| d.format("%Y-%m-%d").to_string()),
            Extractor::EndDate => self
                .iso_dates(text)
                .into_iter()
                .nth(1)
                .or_else(|| self.relative_end(text))
                .map(|d| d.format("%Y-%m-%d").to_string()),
            Extractor::SlotId => self
                .patterns
                .slot_id
                .find(text)
                .map(|m| m.as_str().to_string()),
        }
    }

    fn patient_id(&self, text: &str) -> Option<String> {
        self.patterns
            .patient_id
            .find(text)
            .map(|m| m.as_str().to_string())
    }

    fn patient_name(&self, text: &str) -> Option<String> {
        self.patterns
            .patient_name
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|name| !name.is_empty())
    }

    fn iso_dates(&self, text: &str) -> Vec<NaiveDate> {
        self.patterns
            .iso_date
            .find_iter(text)
            .filter_map(|m| NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok())
            .collect()
    }

    fn relative_start(&self, text: &str) -> Option<NaiveDate> {
        let lower = text.to_lowercase();
        let today = self.today();
        if lower.contains("next week") {
            next_monday(today)
        } else if lower.contains("tomorrow") {
            today.checked_add_days(Days::new(1))
        } else if lower.contains("today") {
            Some(today)
        } else {
            None
        }
    }

    fn relative_end(&self, text: &str) -> Option<NaiveDate> {
        if text.to_lowercase().contains("next week") {
            next_monday(self.today()).and_then(|monday| monday.checked_add_days(Days::new(4)))
        } else {
            None
        }
    }
}

impl FallbackMatcher for KeywordMatcher {
    fn match_text(&self, text: &str, available: &[ActionSpec]) -> Vec<CandidateCall> {
        let mut candidates = Vec::new();

        for spec in available {
            let Some(rule) = self.rules.iter().find(|r| r.action == spec.name()) else {
                continue;
            };
            if !rule.triggered_by(text) {
                continue;
            }

            let mut arguments = Map::new();
            for (name, extractor) in &rule.arguments {
                if let Some(value) = self.extract(extractor, text) {
                    arguments.insert(name.clone(), Value::String(value));
                }
            }

            tracing::debug!(
                action = %rule.action,
                extracted = arguments.len(),
                "Keyword rule matched"
            );
            candidates.push(CandidateCall::new(rule.action.clone(), arguments));
        }

        candidates
    }
}

fn specialty(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    SPECIALTIES
        .iter()
        .find(|(stem, _)| lower.contains(stem))
        .map(|(_, name)| name.to_string())
}

// The Monday strictly after `date`.
fn next_monday(date: NaiveDate) -> Option<NaiveDate> {
    let days = 7 - u64::from(date.weekday().num_days_from_monday());
    date.checked_add_days(Days::new(days))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clinic_core::{ActionHandler, HandlerError, ParamSpec, ParamType};
    use serde_json::json;
    use std::sync::Arc;

    struct Nothing;

    #[async_trait]
    impl ActionHandler for Nothing {
        async fn call(&self, _arguments: &Map<String, Value>) -> Result<Value, HandlerError> {
            Ok(Value::Null)
        }
    }

    fn spec(name: &str) -> ActionSpec {
        ActionSpec::builder(name, Arc::new(Nothing))
            .param(ParamSpec::optional("unused", ParamType::String, ""))
            .build()
    }

    fn all_specs() -> Vec<ActionSpec> {
        [
            "search_patient",
            "check_insurance_eligibility",
            "find_available_slots",
            "book_appointment",
        ]
        .into_iter()
        .map(spec)
        .collect()
    }

    fn matcher() -> KeywordMatcher {
        // 2025-12-17 is a Wednesday.
        KeywordMatcher::clinical()
            .unwrap()
            .with_reference_date(NaiveDate::from_ymd_opt(2025, 12, 17).unwrap())
    }

    #[test]
    fn test_extracts_patient_name_after_keyword() {
        let calls = matcher().match_text("Search for patient Ravi Kumar", &all_specs());
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "search_patient");
        assert_eq!(calls[0].arguments, json!({"query": "Ravi Kumar"}));
    }

    #[test]
    fn test_patient_id_wins_over_name() {
        let calls = matcher().match_text("Look up patient P002 please", &all_specs());
        assert_eq!(calls[0].arguments, json!({"query": "P002"}));
    }

    #[test]
    fn test_unrelated_text_matches_nothing() {
        assert!(matcher()
            .match_text("What is the weather today", &all_specs())
            .is_empty());
    }

    #[test]
    fn test_relative_dates_resolve_against_reference_date() {
        let calls = matcher().match_text("Find available cardio slots next week", &all_specs());
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].arguments,
            json!({
                "specialty": "cardiology",
                "date_range_start": "2025-12-22",
                "date_range_end": "2025-12-26"
            })
        );
    }

    #[test]
    fn test_iso_dates_are_taken_in_order() {
        let calls = matcher().match_text(
            "Any dermatology openings between 2026-01-05 and 2026-01-09?",
            &all_specs(),
        );
        assert_eq!(calls[0].arguments["date_range_start"], "2026-01-05");
        assert_eq!(calls[0].arguments["date_range_end"], "2026-01-09");
    }

    #[test]
    fn test_never_invents_missing_identifiers() {
        let calls = matcher().match_text("Book a cardiology follow-up", &all_specs());
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "book_appointment");
        assert_eq!(calls[0].arguments, json!({}));
    }

    #[test]
    fn test_candidates_follow_registry_order() {
        let text = "Check insurance for P001 cardiology and book SLOT_CAR_2025122309 for P001";
        let calls = matcher().match_text(text, &all_specs());
        let names: Vec<_> = calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["check_insurance_eligibility", "book_appointment"]);
        assert_eq!(
            calls[1].arguments,
            json!({"patient_id": "P001", "slot_id": "SLOT_CAR_2025122309"})
        );
    }

    #[test]
    fn test_rules_only_apply_to_available_actions() {
        let only_search = vec![spec("search_patient")];
        let calls = matcher().match_text("Book SLOT_CAR_2025122309 for P001", &only_search);
        assert!(calls.is_empty());
    }

    #[test]
    fn test_invalid_trigger_is_an_error() {
        assert!(KeywordRule::new("broken", &["(unclosed"]).is_err());
    }
}
