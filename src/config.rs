//! Process configuration.
//!
//! Built once at startup and passed explicitly to the components that need it.
//! Business logic never reads the environment directly.

use crate::error::{ExtractError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default request timeout for the completion endpoint
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default number of retries after the first attempt
const DEFAULT_MAX_RETRIES: u32 = 1;

/// Upper bound on retries, whatever the environment says
pub const MAX_RETRIES_LIMIT: u32 = 2;

/// Completion endpoint configuration
#[derive(Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub stream: bool,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("stream", &self.stream)
            .finish()
    }
}

impl LlmConfig {
    /// Minimal config with defaults for everything but the three required values.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            stream: false,
        }
    }
}

/// Full application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    /// Where raw completions and JSON snapshots are written; disabled when `None`
    pub debug_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from process environment variables.
    ///
    /// Call `dotenvy::dotenv()` beforehand to honour a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Required: `LLM_API_KEY`, `LLM_API_ENDPOINT`, `LLM_MODEL_NAME`.
    /// Optional: `LLM_TIMEOUT_SECS`, `LLM_MAX_RETRIES`, `LLM_STREAM`, `LTE_DEBUG_DIR`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let missing: Vec<&str> = ["LLM_API_KEY", "LLM_API_ENDPOINT", "LLM_MODEL_NAME"]
            .into_iter()
            .filter(|key| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ExtractError::Config(format!(
                "{} must be set in the environment",
                missing.join(", ")
            )));
        }

        let api_key = get("LLM_API_KEY").unwrap_or_default();
        let base_url = get("LLM_API_ENDPOINT").unwrap_or_default();
        let model = get("LLM_MODEL_NAME").unwrap_or_default();

        let parsed = url::Url::parse(&base_url)
            .map_err(|e| ExtractError::Config(format!("LLM_API_ENDPOINT is not a valid URL: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ExtractError::Config(format!(
                "LLM_API_ENDPOINT must use http or https, got {}",
                parsed.scheme()
            )));
        }

        let mut llm = LlmConfig::new(base_url, api_key, model);

        if let Some(raw) = get("LLM_TIMEOUT_SECS") {
            let secs: u64 = raw
                .parse()
                .map_err(|_| ExtractError::Config(format!("LLM_TIMEOUT_SECS is not a number: {}", raw)))?;
            if secs == 0 {
                return Err(ExtractError::Config("LLM_TIMEOUT_SECS must be positive".to_string()));
            }
            llm.timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = get("LLM_MAX_RETRIES") {
            let retries: u32 = raw
                .parse()
                .map_err(|_| ExtractError::Config(format!("LLM_MAX_RETRIES is not a number: {}", raw)))?;
            if retries > MAX_RETRIES_LIMIT {
                return Err(ExtractError::Config(format!(
                    "LLM_MAX_RETRIES must be at most {}",
                    MAX_RETRIES_LIMIT
                )));
            }
            llm.max_retries = retries;
        }

        if let Some(raw) = get("LLM_STREAM") {
            llm.stream = match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(ExtractError::Config(format!("LLM_STREAM is not a boolean: {}", other)));
                }
            };
        }

        Ok(Self {
            llm,
            debug_dir: get("LTE_DEBUG_DIR").map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("LLM_API_KEY", "sk-test"),
        ("LLM_API_ENDPOINT", "https://llm.example.org/v1"),
        ("LLM_MODEL_NAME", "llama-3.1-70b"),
    ];

    #[test]
    fn test_required_values() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).expect("valid config");
        assert_eq!(config.llm.model, "llama-3.1-70b");
        assert_eq!(config.llm.max_retries, 1);
        assert!(!config.llm.stream);
        assert!(config.debug_dir.is_none());
    }

    #[test]
    fn test_missing_values_are_fatal() {
        let err = Config::from_lookup(lookup_from(&[("LLM_API_KEY", "sk-test")])).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("LLM_API_ENDPOINT"));
        assert!(message.contains("LLM_MODEL_NAME"));
        assert!(!message.contains("LLM_API_KEY,"));
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs[2] = ("LLM_MODEL_NAME", "   ");
        assert!(matches!(
            Config::from_lookup(lookup_from(&pairs)),
            Err(ExtractError::Config(_))
        ));
    }

    #[test]
    fn test_optional_values() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("LLM_TIMEOUT_SECS", "45"),
            ("LLM_MAX_RETRIES", "2"),
            ("LLM_STREAM", "true"),
            ("LTE_DEBUG_DIR", "/tmp/lte-debug"),
        ]);
        let config = Config::from_lookup(lookup_from(&pairs)).expect("valid config");
        assert_eq!(config.llm.timeout, Duration::from_secs(45));
        assert_eq!(config.llm.max_retries, 2);
        assert!(config.llm.stream);
        assert_eq!(config.debug_dir, Some(PathBuf::from("/tmp/lte-debug")));
    }

    #[test]
    fn test_retry_budget_is_capped() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("LLM_MAX_RETRIES", "5"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());
    }

    #[test]
    fn test_invalid_endpoint() {
        let mut pairs = REQUIRED.to_vec();
        pairs[1] = ("LLM_API_ENDPOINT", "not a url");
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).expect("valid config");
        assert!(!format!("{:?}", config).contains("sk-test"));
    }
}
