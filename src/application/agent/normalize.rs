//! Normalization of tool responses at the client boundary.
//!
//! Servers and transports disagree on how results are shaped; everything is
//! mapped to a canonical form here, once, so the workflow never guesses.

use serde_json::Value;

/// Decode the text payload of a tool response: JSON when it parses, otherwise
/// the raw text as a JSON string.
pub fn decode_text(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Map a `list_files` response to an ordered list of paths.
///
/// Accepted shapes, and only these:
/// - a sequence of strings
/// - a newline-delimited string (blank lines dropped, entries trimmed)
/// - an object whose `files` key holds a sequence of strings
///
/// Anything else yields an empty list.
pub fn normalize_file_list(response: &Value) -> Vec<String> {
    let files = match response {
        Value::Array(items) => string_items(items),
        Value::String(text) => Some(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
        ),
        Value::Object(map) => match map.get("files") {
            Some(Value::Array(items)) => string_items(items),
            _ => None,
        },
        _ => None,
    };

    files.unwrap_or_else(|| {
        log::warn!("unrecognized list_files response shape; treating as no files");
        Vec::new()
    })
}

fn string_items(items: &[Value]) -> Option<Vec<String>> {
    items
        .iter()
        .map(|item| item.as_str().map(String::from))
        .collect()
}

/// True only when the response carries `success: true`.
pub fn reported_success(response: &Value) -> bool {
    response.get("success").and_then(Value::as_bool) == Some(true)
}

/// Text payload of one tool call, as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResponse {
    raw: String,
}

impl ToolResponse {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Structured view, see [`decode_text`].
    pub fn value(&self) -> Value {
        decode_text(&self.raw)
    }

    /// Plain-text view for responses that are strings (file contents, paths).
    /// A JSON-encoded string is unwrapped; anything else is returned verbatim.
    pub fn text(&self) -> String {
        match decode_text(&self.raw) {
            Value::String(text) => text,
            _ => self.raw.clone(),
        }
    }
}

/// First path that looks like a test file, in list order.
pub fn find_test_file(files: &[String]) -> Option<&str> {
    files
        .iter()
        .map(String::as_str)
        .find(|f| f.starts_with("tests") || f.starts_with("test_") || f.contains("/tests/"))
}

/// The first `max_chars` characters of `text`.
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
