//! Recovery parsing for structured model output.
//!
//! Models asked for a JSON object still wrap it in code fences or surround
//! it with prose. Parsing runs in stages and stops at the first success:
//!
//! 1. parse the trimmed text directly;
//! 2. strip Markdown code fences and parse again;
//! 3. extract the first top-level `{...}` span and parse that.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::AgentError;

/// Longest raw-content preview kept in a parse diagnostic.
const PREVIEW_LEN: usize = 200;

/// Which parse stage produced the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    /// The text was valid JSON as returned.
    Direct,
    /// Valid after removing code fences.
    Unfenced,
    /// Valid after extracting the first brace-delimited span.
    Extracted,
}

/// Parses a model response into a JSON object, repairing common wrapping.
///
/// # Errors
///
/// Returns [`AgentError::InvalidFormat`] if no stage yields a JSON object.
pub fn parse_json_object(content: &str) -> Result<(Map<String, Value>, ParseStage), AgentError> {
    let trimmed = content.trim();

    let direct_err = match parse_object(trimmed) {
        Ok(map) => return Ok((map, ParseStage::Direct)),
        Err(e) => e,
    };

    let unfenced = strip_code_fences(trimmed);
    if unfenced != trimmed
        && let Ok(map) = parse_object(unfenced)
    {
        debug!(stage = "unfenced", "recovered analysis JSON");
        return Ok((map, ParseStage::Unfenced));
    }

    for span in candidate_spans(trimmed) {
        if let Ok(map) = parse_object(span) {
            debug!(stage = "extracted", "recovered analysis JSON");
            return Ok((map, ParseStage::Extracted));
        }
    }

    let mut preview_end = trimmed.len().min(PREVIEW_LEN);
    while !trimmed.is_char_boundary(preview_end) {
        preview_end -= 1;
    }
    Err(AgentError::InvalidFormat {
        message: format!(
            "{direct_err}. Response length: {} bytes, preview: {:?}",
            trimmed.len(),
            &trimmed[..preview_end]
        ),
        content: content.to_string(),
    })
}

fn parse_object(text: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {}", json_kind(&other))),
        Err(e) => Err(format!("failed to parse analysis JSON: {e}")),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Removes a surrounding Markdown code fence (with optional language tag).
fn strip_code_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. "json") up to the first newline.
    let body = rest.find('\n').map_or(rest, |i| &rest[i + 1..]);
    body.trim_end().trim_end_matches("```").trim()
}

/// Candidate object spans, best first: the first balanced top-level span,
/// then everything from the first `{` to the last `}`.
fn candidate_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::with_capacity(2);
    let Some(start) = text.find('{') else {
        return spans;
    };
    if let Some(end) = balanced_end(text, start) {
        spans.push(&text[start..=end]);
    }
    if let Some(last) = text.rfind('}')
        && last > start
    {
        let widest = &text[start..=last];
        if spans.first() != Some(&widest) {
            spans.push(widest);
        }
    }
    spans
}

/// Byte index of the `}` closing the `{` at `start`, skipping braces inside strings.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}
