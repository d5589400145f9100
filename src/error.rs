//! Custom error types for lte-extract.
//!
//! All fallible functions return `Result<T, ExtractError>` instead of using `unwrap()`.
//! Validation failures carry every offending field path, see [`ValidationErrors`].

use std::fmt;
use thiserror::Error;

/// Main error type for lte-extract operations.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Required configuration missing or invalid (fatal at startup)
    #[error("Config error: {0}")]
    Config(String),

    /// Client supplied an unusable request
    #[error("Input error: {0}")]
    Input(String),

    /// Network/HTTP request error (includes timeouts)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Completion endpoint answered with a non-success status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: i32,
        /// Error body or description
        message: String,
    },

    /// Completion endpoint answered successfully but with an unreadable envelope
    #[error("Parse error: {0}")]
    Parse(String),

    /// No JSON object could be located in a completion
    #[error("no JSON object found in completion")]
    JsonNotFound,

    /// A JSON object was located but could not be decoded
    #[error("malformed JSON in completion: {0}")]
    MalformedJson(#[source] serde_json::Error),

    /// Decoded JSON violates the extraction schema
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    /// PDF could not be read or its text extracted
    #[error("PDF error: {0}")]
    Pdf(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ExtractError {
    /// Whether a completion request failing with this error may be attempted again.
    pub fn is_transient(&self) -> bool {
        match self {
            ExtractError::Network(_) => true,
            ExtractError::Api { code, .. } => *code == 429 || (500..600).contains(code),
            _ => false,
        }
    }
}

/// Result type alias using `ExtractError`
pub type Result<T> = std::result::Result<T, ExtractError>;

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Dotted/indexed path, e.g. `datasets[0].variables[1].name`
    pub path: String,
    pub reason: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// All schema violations found in one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
pub struct ValidationErrors {
    pub violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    pub fn push(&mut self, path: impl Into<String>, reason: impl Into<String>) {
        self.violations.push(FieldViolation {
            path: path.into(),
            reason: reason.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Paths of every violation, in discovery order.
    pub fn paths(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.path.as_str()).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .violations
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| ExtractError::Parse(msg.to_string()))
    }
}
