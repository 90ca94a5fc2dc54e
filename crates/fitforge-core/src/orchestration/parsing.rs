//! Tolerant extraction of a JSON object from a chat model's free-text
//! response (spec §4.5 edge case: "model response is not valid JSON").
//!
//! Chat models routinely wrap JSON in fenced code blocks or prose ("Here's
//! your plan:\n```json\n{...}\n```"). This strips the common wrapping before
//! attempting `serde_json::from_str`, and falls back to locating the first
//! balanced `{...}` span so a stray sentence before or after the object
//! doesn't fail the whole parse.

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("no JSON object found in model response")]
    NotFound,
    #[error("found a JSON-shaped span but it failed to parse: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Attempts to pull a single JSON object out of free-form model output.
pub fn extract_json_object(raw: &str) -> Result<Value, ExtractError> {
    let stripped = strip_fences(raw);

    if let Ok(value) = serde_json::from_str::<Value>(stripped.trim()) {
        return Ok(value);
    }

    let span = first_balanced_object(stripped).ok_or(ExtractError::NotFound)?;
    Ok(serde_json::from_str(span)?)
}

fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let after_open = after_open.strip_prefix("json").unwrap_or(after_open);
    after_open.rsplit_once("```").map_or(after_open, |(body, _)| body).trim()
}

/// Scans for the first top-level `{...}` span with balanced braces, ignoring
/// braces that appear inside string literals.
fn first_balanced_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=offset]);
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

    #[test]
    fn parses_bare_json() {
        let value = extract_json_object(r#"{"a": 1}"#).unwrap();
        assert_eq!(value, serde_json::json!({"a": 1}));
    }

    #[test]
    fn strips_fenced_code_block() {
        let raw = "Here's your plan:\n```json\n{\"a\": 1}\n```\nEnjoy!";
        let value = extract_json_object(raw).unwrap();
        assert_eq!(value, serde_json::json!({"a": 1}));
    }

    #[test]
    fn finds_object_amid_prose_without_fences() {
        let raw = "Sure, here you go {\"a\": {\"b\": 2}} hope that helps";
        let value = extract_json_object(raw).unwrap();
        assert_eq!(value, serde_json::json!({"a": {"b": 2}}));
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_balance() {
        let raw = r#"{"note": "use a { brace } here", "n": 1}"#;
        let value = extract_json_object(raw).unwrap();
        assert_eq!(value["n"], 1);
    }

    #[test]
    fn returns_not_found_when_no_object_present() {
        assert!(matches!(extract_json_object("no json here"), Err(ExtractError::NotFound)));
    }
}
