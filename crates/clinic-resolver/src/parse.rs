//! Extraction of function calls from a model completion.
//!
//! Completions are free text. The first structured block that reads as a
//! list of calls wins: fenced code blocks are tried first, then balanced
//! `[...]` / `{...}` spans from left to right.

use serde_json::{Map, Value};

use crate::error::ResolveError;

const NAME_KEYS: &[&str] = &["name", "function", "action"];
const ARGUMENT_KEYS: &[&str] = &["arguments", "parameters", "args"];
const LIST_KEYS: &[&str] = &["calls", "function_calls", "tool_calls"];

/// Only this much of a completion is searched for a block.
const MAX_SCAN_BYTES: usize = 64 * 1024;
/// Bracket positions tried as the start of an unfenced block.
const MAX_BLOCK_STARTS: usize = 128;

/// An unvalidated call proposed by the model or the fallback matcher.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateCall {
    pub name: String,
    pub arguments: Value,
}

impl CandidateCall {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments: Value::Object(arguments),
        }
    }
}

/// Parse the calls out of a completion.
///
/// `Ok(vec![])` means the model explicitly answered with an empty list.
/// A completion without any usable block is `Unparsable`.
pub fn parse_completion(completion: &str) -> Result<Vec<CandidateCall>, ResolveError> {
    let completion = scan_window(completion);

    for block in fenced_blocks(completion) {
        if let Some(calls) = read_block(block) {
            return Ok(calls);
        }
    }

    let starts = completion
        .char_indices()
        .filter(|(_, c)| *c == '[' || *c == '{')
        .map(|(idx, _)| idx);
    for (tried, start) in starts.enumerate() {
        if tried == MAX_BLOCK_STARTS {
            tracing::warn!(
                limit = MAX_BLOCK_STARTS,
                "Giving up on completion after too many bracket positions"
            );
            break;
        }
        let Some(end) = balanced_end(completion, start) else {
            continue;
        };
        if let Some(calls) = read_block(&completion[start..end]) {
            return Ok(calls);
        }
    }

    Err(ResolveError::Unparsable(
        "no structured block in completion".to_string(),
    ))
}

/// The leading part of `completion` that is searched, cut on a char boundary.
fn scan_window(completion: &str) -> &str {
    if completion.len() <= MAX_SCAN_BYTES {
        return completion;
    }
    let mut cut = MAX_SCAN_BYTES;
    while !completion.is_char_boundary(cut) {
        cut -= 1;
    }
    tracing::warn!(
        length = completion.len(),
        scanned = cut,
        "Completion too long, searching only its beginning"
    );
    &completion[..cut]
}

fn read_block(block: &str) -> Option<Vec<CandidateCall>> {
    let value: Value = serde_json::from_str(block.trim()).ok()?;
    calls_from_value(&value)
}

fn calls_from_value(value: &Value) -> Option<Vec<CandidateCall>> {
    match value {
        Value::Array(items) => calls_from_list(items),
        Value::Object(obj) => {
            for key in LIST_KEYS {
                if let Some(Value::Array(items)) = obj.get(*key) {
                    return calls_from_list(items);
                }
            }
            call_from_object(obj).map(|call| vec![call])
        }
        _ => None,
    }
}

fn calls_from_list(items: &[Value]) -> Option<Vec<CandidateCall>> {
    if items.is_empty() {
        return Some(Vec::new());
    }

    let calls: Vec<CandidateCall> = items
        .iter()
        .filter_map(|item| match item {
            Value::Object(obj) => call_from_object(obj),
            _ => None,
        })
        .collect();

    if calls.is_empty() {
        return None;
    }
    if calls.len() < items.len() {
        tracing::warn!(
            skipped = items.len() - calls.len(),
            "Ignoring list items that are not call objects"
        );
    }
    Some(calls)
}

fn call_from_object(obj: &Map<String, Value>) -> Option<CandidateCall> {
    // Tool-call envelopes nest the call under "function".
    if let Some(Value::Object(inner)) = obj.get("function") {
        return call_from_object(inner);
    }

    let name = NAME_KEYS
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))?
        .trim()
        .to_string();
    if name.is_empty() {
        return None;
    }

    let arguments = match ARGUMENT_KEYS.iter().find_map(|key| obj.get(*key)) {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(Value::String(raw)) => {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()))
        }
        Some(other) => other.clone(),
    };

    Some(CandidateCall { name, arguments })
}

/// Contents of every ``` fenced block, language tag stripped.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("```") {
        let after = &rest[open + 3..];
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        // An inline fence like ```[...]``` has no language tag line.
        let body_start = if after[..body_start].trim_start().starts_with(['[', '{']) {
            0
        } else {
            body_start
        };
        let body = &after[body_start..];
        match body.find("```") {
            Some(close) => {
                blocks.push(&body[..close]);
                rest = &body[close + 3..];
            }
            None => break,
        }
    }

    blocks
}

/// Byte index just past the bracket matching the one at `start`.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset + c.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(calls: &[CandidateCall]) -> Vec<&str> {
        calls.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_parses_bare_array() {
        let calls = parse_completion(
            r#"[{"name": "search_patient", "arguments": {"query": "Ravi Kumar"}}]"#,
        )
        .unwrap();
        assert_eq!(names(&calls), vec!["search_patient"]);
        assert_eq!(calls[0].arguments, json!({"query": "Ravi Kumar"}));
    }

    #[test]
    fn test_prefers_fenced_block_over_surrounding_prose() {
        let completion = "I will look up [the patient] first.\n\
            ```json\n\
            [{\"function\": \"search_patient\", \"parameters\": {\"query\": \"P001\"}}]\n\
            ```\nDone.";
        let calls = parse_completion(completion).unwrap();
        assert_eq!(names(&calls), vec!["search_patient"]);
        assert_eq!(calls[0].arguments, json!({"query": "P001"}));
    }

    #[test]
    fn test_finds_block_after_reasoning_text() {
        let completion = r#"The user wants slots. {"calls": [{"action": "find_available_slots", "args": {"specialty": "cardiology", "date_range_start": "2025-12-23"}}]} Hope that helps."#;
        let calls = parse_completion(completion).unwrap();
        assert_eq!(names(&calls), vec!["find_available_slots"]);
    }

    #[test]
    fn test_braces_inside_strings_do_not_break_spans() {
        let completion = r#"{"name": "search_patient", "arguments": {"query": "odd } name {"}}"#;
        let calls = parse_completion(completion).unwrap();
        assert_eq!(calls[0].arguments, json!({"query": "odd } name {"}));
    }

    #[test]
    fn test_accepts_tool_call_envelopes_with_string_arguments() {
        let completion = r#"{"tool_calls": [{"id": "c1", "function": {"name": "book_appointment", "arguments": "{\"patient_id\": \"P001\", \"slot_id\": \"SLOT_CAR_2025122309\"}"}}]}"#;
        let calls = parse_completion(completion).unwrap();
        assert_eq!(names(&calls), vec!["book_appointment"]);
        assert_eq!(
            calls[0].arguments,
            json!({"patient_id": "P001", "slot_id": "SLOT_CAR_2025122309"})
        );
    }

    #[test]
    fn test_explicit_empty_list_is_not_an_error() {
        assert!(parse_completion("Nothing applies here: []").unwrap().is_empty());
    }

    #[test]
    fn test_prose_without_a_block_is_unparsable() {
        let err = parse_completion("I think you should search for the patient.").unwrap_err();
        assert!(matches!(err, ResolveError::Unparsable(_)));
    }

    #[test]
    fn test_blocks_that_are_not_calls_are_skipped() {
        let completion = r#"Scores: [1, 2, 3]. Answer: [{"name": "search_patient", "arguments": {"query": "Ravi"}}]"#;
        let calls = parse_completion(completion).unwrap();
        assert_eq!(names(&calls), vec!["search_patient"]);
    }

    #[test]
    fn test_unclosed_brackets_give_up_quickly() {
        let completion = "[".repeat(200_000);
        let started = std::time::Instant::now();

        let err = parse_completion(&completion).unwrap_err();

        assert!(matches!(err, ResolveError::Unparsable(_)));
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_long_completion_still_finds_a_leading_block() {
        let completion = format!(
            r#"[{{"name": "search_patient", "arguments": {{"query": "P001"}}}}] {}"#,
            "é".repeat(MAX_SCAN_BYTES)
        );
        let calls = parse_completion(&completion).unwrap();
        assert_eq!(names(&calls), vec!["search_patient"]);
    }

    #[test]
    fn test_scan_window_cuts_on_a_char_boundary() {
        let text = format!("a{}", "é".repeat(MAX_SCAN_BYTES));
        let window = scan_window(&text);
        assert!(window.len() <= MAX_SCAN_BYTES);
        assert!(window.len() >= MAX_SCAN_BYTES - 1);
    }
}
