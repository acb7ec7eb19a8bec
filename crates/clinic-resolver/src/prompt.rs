//! Prompt construction for the language model.

use clinic_core::{ActionSpec, describe_all};

const SAFETY_RULES: &[&str] = &[
    "You assist clinic staff with administrative scheduling tasks only.",
    "Never provide a diagnosis, treatment or any other medical advice.",
    "Never invent patient data, identifiers, slots or dates. Use only values stated in the request.",
    "If a required value is not stated in the request, do not call the function that needs it.",
    "Use only the functions listed below, with exactly the listed parameters.",
];

/// Build the completion prompt for `request` over the `available` actions.
pub fn build_prompt(request: &str, available: &[ActionSpec]) -> String {
    let mut prompt = String::new();

    prompt.push_str("Rules:\n");
    for (idx, rule) in SAFETY_RULES.iter().enumerate() {
        prompt.push_str(&format!("{}) {}\n", idx + 1, rule));
    }

    prompt.push_str("\nFunctions:\n");
    let rendered =
        serde_json::to_string_pretty(&describe_all(available)).unwrap_or_else(|_| "[]".to_string());
    prompt.push_str(&rendered);
    prompt.push('\n');

    prompt.push_str("\nRequest:\n");
    prompt.push_str(request.trim());
    prompt.push('\n');

    prompt.push_str("\nRespond with JSON only, in this shape:\n");
    prompt.push_str(r#"[{"name": "function_name", "arguments": {"param": "value"}}]"#);
    prompt.push_str("\nList calls in the order they should run. Respond with [] if no function applies.\n");

    prompt
}
