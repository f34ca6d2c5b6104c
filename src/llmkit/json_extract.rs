//! Robust JSON extraction from free-form model output.
//!
//! Models asked for "STRICT JSON" still wrap it in prose, fences or a
//! reasoning trace. [`extract_json`] tries, in order, and returns the first
//! payload that parses:
//!
//! 1. the whole (trimmed) text,
//! 2. the body of the first fenced code block (```` ```json ```` or bare ```` ``` ````),
//! 3. a balanced `{ ... }` slice, scanning string literals and escapes so braces
//!    inside strings do not count, starting from each `{` in turn,
//! 4. the greedy span from the first `{` to the last `}`,
//! 5. the greedy span from the first `[` to the last `]`.
//!
//! ```rust
//! use llmkit::json_extract::extract_json;
//!
//! let reply = "Sure! ```json\n{\"action\": \"search\", \"action_input\": \"rust\"}\n``` Done.";
//! let value = extract_json(reply).unwrap();
//! assert_eq!(value["action"], "search");
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").unwrap();
}

/// Upper bound on `{` positions tried by the balanced scan.
const MAX_OBJECT_CANDIDATES: usize = 64;

/// Extract the first JSON value found in `text`, or `None`.
pub fn extract_json(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }

    if let Some(body) = CODE_FENCE.captures(text).and_then(|c| c.get(1)) {
        if let Ok(value) = serde_json::from_str(body.as_str()) {
            return Some(value);
        }
    }

    if let Some(value) = balanced_objects(text)
        .into_iter()
        .find_map(|slice| serde_json::from_str(slice).ok())
    {
        return Some(value);
    }

    if let Some(value) = greedy_span(text, '{', '}').and_then(|s| serde_json::from_str(s).ok()) {
        return Some(value);
    }

    if let Some(value) = greedy_span(text, '[', ']').and_then(|s| serde_json::from_str(s).ok()) {
        return Some(value);
    }

    log::warn!(
        "extract_json: no JSON found, first 100 chars: {}",
        text.chars().take(100).collect::<String>()
    );
    None
}

/// [`extract_json`] with a fallback value.
pub fn extract_json_or(text: &str, default: Value) -> Value {
    extract_json(text).unwrap_or(default)
}

/// Like [`extract_json`] but only accepts JSON objects.
pub fn extract_json_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    match extract_json(text)? {
        Value::Object(map) => Some(map),
        _ => {
            // A bare array or scalar won; look for an object further in.
            balanced_objects(text.trim())
                .into_iter()
                .find_map(|slice| match serde_json::from_str(slice) {
                    Ok(Value::Object(map)) => Some(map),
                    _ => None,
                })
        }
    }
}

/// Every balanced `{...}` slice, one per starting brace, in order of appearance.
fn balanced_objects(text: &str) -> Vec<&str> {
    text.match_indices('{')
        .take(MAX_OBJECT_CANDIDATES)
        .filter_map(|(start, _)| balanced_from(text, start))
        .collect()
}

fn balanced_from(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn greedy_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end > start {
        Some(&text[start..end + close.len_utf8()])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direct_parse() {
        assert_eq!(extract_json(" {\"a\": 1} "), Some(json!({"a": 1})));
        assert_eq!(extract_json("[1, 2]"), Some(json!([1, 2])));
    }

    #[test]
    fn test_empty_and_garbage() {
        assert_eq!(extract_json(""), None);
        assert_eq!(extract_json("   \n"), None);
        assert_eq!(extract_json("no json here at all"), None);
        assert_eq!(extract_json("{ broken: yes"), None);
    }

    #[test]
    fn test_fenced_blocks() {
        let tagged = "Here you go:\n```json\n{\"queries\": [\"a\", \"b\"]}\n```\nthanks";
        assert_eq!(extract_json(tagged).unwrap()["queries"][1], "b");

        let bare = "```\n{\"x\": true}\n```";
        assert_eq!(extract_json(bare), Some(json!({"x": true})));
    }

    #[test]
    fn test_fence_with_non_json_falls_through() {
        let text = "```python\nprint('hi')\n```\nfinal: {\"action\": \"answer\"}";
        assert_eq!(extract_json(text).unwrap()["action"], "answer");
    }

    #[test]
    fn test_prose_wrapped_object_with_braces_in_strings() {
        let text = r#"I decided. {"thought": "use {curly} braces", "action": "visit", "action_input": "https://x.y"} ok"#;
        let value = extract_json(text).unwrap();
        assert_eq!(value["thought"], "use {curly} braces");
        assert_eq!(value["action"], "visit");
    }

    #[test]
    fn test_skips_non_json_brace_groups_in_reasoning() {
        let trace = "Let me think about {the options} first. Then {\"action\": \"search\", \"action_input\": \"q\"}";
        assert_eq!(extract_json(trace).unwrap()["action"], "search");
    }

    #[test]
    fn test_escaped_quotes_inside_strings() {
        let text = r#"note {"thought": "she said \"}\" twice", "action": "answer", "action_input": "x"} end"#;
        assert_eq!(extract_json(text).unwrap()["action_input"], "x");
    }

    #[test]
    fn test_array_fallback() {
        let text = "the list is [\"a\", \"b\"] as requested";
        assert_eq!(extract_json(text), Some(json!(["a", "b"])));
    }

    #[test]
    fn test_extract_json_or_default() {
        assert_eq!(extract_json_or("nope", json!({})), json!({}));
    }

    #[test]
    fn test_object_only_variant() {
        assert!(extract_json_object("[1,2,3]").is_none());
        let map = extract_json_object("[1] then {\"k\": \"v\"}").unwrap();
        assert_eq!(map["k"], "v");
    }
}
