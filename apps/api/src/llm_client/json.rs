//! Recovery of JSON payloads from free-form model output.
//!
//! The provider does not guarantee pure JSON: replies may carry prose, code
//! fences or stray backticks around the payload.

use serde::de::DeserializeOwned;

use super::LlmError;

/// Returns the substring from the first `[` to the last `]`, inclusive.
pub fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (start < end).then(|| &text[start..=end])
}

/// Returns the substring from the first `{` to the last `}`, inclusive.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Removes ```json / ``` fences wherever they appear, plus surrounding backticks.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .trim_matches('`')
        .trim()
        .to_string()
}

/// Parses a JSON array embedded anywhere in `text`.
pub fn parse_json_array<T: DeserializeOwned>(text: &str) -> Result<Vec<T>, LlmError> {
    let payload = extract_json_array(text).ok_or(LlmError::MissingJson("a JSON array"))?;
    serde_json::from_str(payload).map_err(LlmError::Parse)
}

/// Parses a JSON object after stripping code fences, falling back to the
/// outermost `{ ... }` span when the cleaned text still carries prose.
pub fn parse_json_object<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let cleaned = strip_code_fences(text);
    match serde_json::from_str(&cleaned) {
        Ok(value) => Ok(value),
        Err(direct) => {
            let payload = extract_json_object(&cleaned).ok_or(LlmError::Parse(direct))?;
            serde_json::from_str(payload).map_err(LlmError::Parse)
        }
    }
}
