//! Model response normalization
//!
//! Every agent and the planner go through these helpers, so they have to be
//! total over whatever shape a provider hands back: plain strings, arrays of
//! content parts, nested `content`/`text`/`output_text` fields, or JSON
//! wrapped in prose and code fences.

use serde_json::Value;

use super::error::{LlmError, LlmResult};

/// Collapse a provider response body into plain text.
///
/// Never fails: inputs with no recognizable textual field fall back to their
/// JSON representation.
pub fn extract_text(content: &Value) -> String {
    let text = collect_text(content);
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    content.to_string()
}

fn collect_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(collect_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => {
            if let Some(Value::String(s)) = map.get("text") {
                return s.clone();
            }
            if let Some(Value::String(s)) = map.get("output_text") {
                return s.clone();
            }
            match map.get("content") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Array(items)) => collect_text(&Value::Array(items.clone())),
                _ => String::new(),
            }
        }
        _ => String::new(),
    }
}

/// Strip Markdown code fences, recognizing optional `json`/`latex`/`tex` tags.
pub fn strip_code_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("```") {
            let rest = rest.trim_start();
            let token = rest.split_whitespace().next().unwrap_or("");
            let tag = token.to_ascii_lowercase();
            if tag.is_empty() || tag == "json" || tag == "latex" || tag == "tex" {
                // Drop the fence marker and its tag token, but keep anything
                // after them on the same line (one-line fenced responses).
                let remainder = rest[token.len()..].trim();
                let remainder = remainder.strip_suffix("```").unwrap_or(remainder).trim();
                if !remainder.is_empty() {
                    out.push_str(remainder);
                    out.push('\n');
                }
                continue;
            }
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

/// Recover a JSON value from model output.
///
/// Strategy: strip fences, try a direct parse, then scan for the first `{`
/// or `[` and attempt balanced extraction, sliding forward past candidates
/// that do not parse. Handles models that wrap JSON in prose.
pub fn parse_json(text: &str) -> LlmResult<Value> {
    let cleaned = strip_code_fences(text);
    if cleaned.is_empty() {
        return Err(LlmError::Parse("Empty response".to_string()));
    }

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Ok(value);
    }

    let bytes = cleaned.as_bytes();
    for start in 0..bytes.len() {
        let opener = bytes[start];
        if opener != b'{' && opener != b'[' {
            continue;
        }
        if let Some(candidate) = extract_balanced(&cleaned, start) {
            if let Ok(value) = serde_json::from_str::<Value>(candidate) {
                return Ok(value);
            }
        }
    }

    Err(LlmError::Parse("Invalid JSON".to_string()))
}

/// Extract a balanced `{...}` or `[...]` slice starting at `start`, tracking
/// string-literal state so braces inside quoted strings are ignored.
fn extract_balanced(text: &str, start: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    let opener = bytes[start];
    let closer = if opener == b'{' { b'}' } else { b']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        if b == b'"' {
            in_string = true;
            continue;
        }
        if b == opener {
            depth += 1;
        }
        if b == closer {
            depth -= 1;
            if depth == 0 {
                return Some(&text[start..=i]);
            }
        }
    }

    None
}
