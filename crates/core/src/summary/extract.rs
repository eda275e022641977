use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::text::truncate;

/// Characters of context kept in extraction diagnostics.
pub const SNIPPET_CHARS: usize = 200;

/// Longer spans tried after the shortest one fails to parse.
const MAX_EXTENDED_SPANS: usize = 16;

static ARRAY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[\s*\{.*?\}\s*\]").expect("array pattern is valid"));

static ARRAY_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\}\s*\]").expect("array close pattern is valid"));

/// Failure to isolate a JSON array from free-form model output.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ExtractError {
    #[error("Could not find a JSON array in model response. Raw response: {preview}...")]
    NotFound { preview: String },

    #[error("Invalid JSON array from model. Error: {message}. Raw JSON: {snippet}...")]
    InvalidJson { snippet: String, message: String },
}

/// Find and parse the first JSON array of objects embedded in `text`.
///
/// The search is non-greedy, so prose that mentions two arrays yields the
/// first one. When the shortest span does not parse (an object holding its
/// own array of objects closes early), longer spans starting at the same
/// bracket are tried in order, a bounded number of them.
pub fn extract_json_array(text: &str) -> Result<Vec<Value>, ExtractError> {
    let found = ARRAY_PATTERN
        .find(text)
        .ok_or_else(|| ExtractError::NotFound {
            preview: truncate(text, SNIPPET_CHARS).to_string(),
        })?;

    let shortest_error = match serde_json::from_str::<Vec<Value>>(found.as_str()) {
        Ok(values) => return Ok(values),
        Err(e) => e,
    };

    let tail = &text[found.end()..];
    for close in ARRAY_CLOSE.find_iter(tail).take(MAX_EXTENDED_SPANS) {
        let candidate = &text[found.start()..found.end() + close.end()];
        if let Ok(values) = serde_json::from_str::<Vec<Value>>(candidate) {
            return Ok(values);
        }
    }

    Err(ExtractError::InvalidJson {
        snippet: truncate(found.as_str(), SNIPPET_CHARS).to_string(),
        message: shortest_error.to_string(),
    })
}
