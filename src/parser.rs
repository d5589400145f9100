//! Locating and decoding the JSON object inside a completion.
//!
//! Models are told to return raw JSON but regularly wrap it in a Markdown
//! fence or a sentence of prose. Three shapes are accepted, tried in order:
//! a bare object, a fenced block (with or without a `json` tag), and an
//! object embedded in surrounding text.

use crate::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static FENCED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?i:json)?\s*(\{.*?\})\s*```").expect("valid fenced block regex")
});

/// Why a completion could not be turned into JSON
#[derive(Debug)]
pub enum ParseError {
    /// No candidate object in the text
    NotFound,
    /// A candidate was found but is not valid JSON
    Malformed(serde_json::Error),
}

impl From<ParseError> for ExtractError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::NotFound => ExtractError::JsonNotFound,
            ParseError::Malformed(e) => ExtractError::MalformedJson(e),
        }
    }
}

/// Return the slice of `raw` holding the JSON object.
pub fn extract_json(raw: &str) -> Result<&str, ParseError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Ok(trimmed);
    }

    if let Some(inner) = FENCED_RE.captures(trimmed).and_then(|c| c.get(1)) {
        return Ok(inner.as_str());
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&trimmed[start..=end]),
        _ => Err(ParseError::NotFound),
    }
}

/// Locate and decode the JSON object in a completion.
pub fn parse_completion(raw: &str) -> Result<Value, ParseError> {
    let candidate = extract_json(raw)?;
    serde_json::from_str(candidate).map_err(ParseError::Malformed)
}
