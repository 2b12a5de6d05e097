//! Cleanup and validation of generative service output.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::contract::TaskContract;
use crate::error::{MlError, MlResult};

/// Conversational openers that never belong to a structured answer.
const BANNED_PREFIXES: &[&str] = &[
    "understood",
    "i understand",
    "here is the",
    "here's a",
    "here is a",
    "sure,",
    "sure!",
    "okay,",
    "ok,",
    "certainly",
    "i am ready",
    "i'm ready",
    "i'll start",
    "generating",
    "acknowledged",
    "i will begin",
    "i have analyzed",
    "i will now",
    "let's hit the road",
    "what's our first move",
];

/// First-person narration openers.
const NARRATION_PREFIXES: &[&str] = &["i'll ", "i will ", "i am ", "i have "];

/// Log lines some CLI wrappers print before the answer.
const TOOL_NOISE_PREFIXES: &[&str] = &["loaded cached credentials", "hook registry initialized"];

fn thinking_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<(thinking|think|scratchpad)>.*?</(thinking|think|scratchpad)>")
            .expect("thinking-block pattern is valid")
    })
}

/// Remove scratch blocks, code fences and chatty lines.
pub fn clean_output(raw: &str) -> String {
    let without_thinking = thinking_block().replace_all(raw.trim(), "");

    without_thinking
        .lines()
        .filter(|line| {
            let lower = line.trim().to_lowercase();
            if lower.starts_with("```") {
                return false;
            }
            !(BANNED_PREFIXES.iter().any(|p| lower.starts_with(p))
                || NARRATION_PREFIXES.iter().any(|p| lower.starts_with(p))
                || TOOL_NOISE_PREFIXES.iter().any(|p| lower.starts_with(p)))
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Slice from the first `{` to the last `}`, if both exist in that order.
pub fn outermost_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Clean `raw`, cut out the outermost JSON object, check it against
/// `contract` and parse it.
pub fn extract_validated_json(raw: &str, contract: TaskContract) -> MlResult<serde_json::Value> {
    let cleaned = clean_output(raw);
    let candidate = outermost_json(&cleaned).unwrap_or(&cleaned);

    contract
        .check(candidate)
        .map_err(|reason| MlError::contract(contract.name(), reason))?;

    let value: serde_json::Value = serde_json::from_str(candidate)
        .map_err(|e| MlError::contract(contract.name(), format!("not valid JSON: {e}")))?;

    if !value.is_object() {
        return Err(MlError::contract(contract.name(), "top-level value is not an object"));
    }

    debug!(task = contract.name(), bytes = candidate.len(), "Accepted generative output");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_preamble_and_thinking() {
        let raw = "Sure, here you go!\n<thinking>\nThe user wants {a plan}\n</thinking>\nI'll start with the hook.\n```json\n{\"segments\": [], \"global_style\": {}}\n```\nHope this helps";
        let value = extract_validated_json(raw, TaskContract::DirectorPlan).unwrap();
        assert!(value["segments"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_outermost_object_wins_over_inner_braces() {
        let text = "noise {\"a\": {\"b\": 1}} trailing } junk";
        assert_eq!(outermost_json(text), Some("{\"a\": {\"b\": 1}} trailing }"));
        assert_eq!(outermost_json("} backwards {"), None);
        assert_eq!(outermost_json("no braces"), None);
    }

    #[test]
    fn test_rejects_chat_without_json() {
        let err = extract_validated_json("Understood. I am ready.", TaskContract::DirectorPlan)
            .unwrap_err();
        assert!(matches!(
            err,
            MlError::ContractViolation {
                task: "DirectorPlan",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_broken_json_that_passes_shape_check() {
        let raw = "{\"segments\": [ {\"timeRange\": \"0-3s\" ";
        // No closing brace: candidate falls back to the whole text.
        let err = extract_validated_json(raw, TaskContract::DirectorPlan).unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn test_clean_output_keeps_json_lines() {
        let cleaned = clean_output("Loaded cached credentials.\nOkay, done\n{\"x\": 1}");
        assert_eq!(cleaned, "{\"x\": 1}");
    }
}
