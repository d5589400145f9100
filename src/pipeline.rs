//! Text → completion → JSON → validated record.
//!
//! Each request runs the three stages in order with no retries across
//! stages. A failure carries the stage it happened in so callers can tell
//! "the model never answered" apart from "the model answered wrong".

use crate::completion::CompletionBackend;
use crate::debug_log::DebugSink;
use crate::error::ExtractError;
use crate::models::ExtractionResponse;
use crate::parser;
use crate::prompts::SYSTEM_PROMPT;
use crate::schema;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Pipeline stage at which a request failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Completion,
    Parsing,
    Validation,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Completion => "completion",
            Stage::Parsing => "parsing",
            Stage::Validation => "validation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: ExtractError,
}

impl StageError {
    fn new(stage: Stage, source: impl Into<ExtractError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

/// Shared, immutable extraction pipeline
#[derive(Clone)]
pub struct ExtractionPipeline {
    backend: Arc<dyn CompletionBackend>,
    debug: DebugSink,
}

impl ExtractionPipeline {
    pub fn new(backend: Arc<dyn CompletionBackend>, debug: DebugSink) -> Self {
        Self { backend, debug }
    }

    /// Run one document through all stages.
    pub async fn run(&self, text: &str) -> Result<ExtractionResponse, StageError> {
        info!(chars = text.len(), "Extracting metadata");

        let raw = self
            .backend
            .complete(SYSTEM_PROMPT, text)
            .await
            .map_err(|e| StageError::new(Stage::Completion, e))?;
        self.debug.record_raw(&raw).await;

        if raw.trim().is_empty() {
            warn!("Completion endpoint returned an empty response");
            return Err(StageError::new(
                Stage::Parsing,
                ExtractError::Parse("LLM returned empty response".to_string()),
            ));
        }

        let value = parser::parse_completion(&raw).map_err(|e| {
            let preview: String = raw.chars().take(200).collect();
            warn!(content_preview = %preview, "Completion did not contain usable JSON");
            StageError::new(Stage::Parsing, e)
        })?;
        self.debug.snapshot(&value).await;

        let record = schema::validate(&value).map_err(|e| {
            warn!(violations = e.violations.len(), error = %e, "Completion failed schema validation");
            StageError::new(Stage::Validation, e)
        })?;

        info!(
            title = %record.citation.title,
            datasets = record.datasets.len(),
            "Metadata extracted"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend returning a canned reply and counting calls
    struct FixedBackend {
        reply: std::result::Result<String, fn() -> ExtractError>,
        calls: AtomicUsize,
    }

    impl FixedBackend {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(make: fn() -> ExtractError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(make),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for FixedBackend {
        async fn complete(&self, instruction: &str, _content: &str) -> Result<String> {
            assert_eq!(instruction, SYSTEM_PROMPT);
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    fn pipeline(backend: Arc<FixedBackend>) -> ExtractionPipeline {
        ExtractionPipeline::new(backend, DebugSink::default())
    }

    const VALID: &str = r#"{"citation": {"title": "T", "authors": [], "journal": {"name": "J"}, "keywords": [], "subject_classifications": []}, "datasets": []}"#;

    #[tokio::test]
    async fn test_successful_run() {
        let backend = FixedBackend::ok(&format!("```json\n{}\n```", VALID));
        let record = pipeline(backend.clone()).run("article").await.unwrap();
        assert_eq!(record.citation.title, "T");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_completion_failure_stage() {
        let backend = FixedBackend::failing(|| ExtractError::Api {
            code: 500,
            message: "boom".to_string(),
        });
        let err = pipeline(backend).run("article").await.unwrap_err();
        assert_eq!(err.stage, Stage::Completion);
        assert!(err.to_string().starts_with("completion failed:"));
    }

    #[tokio::test]
    async fn test_empty_completion_is_parse_failure() {
        let err = pipeline(FixedBackend::ok("  \n")).run("article").await.unwrap_err();
        assert_eq!(err.stage, Stage::Parsing);
        assert!(err.to_string().contains("empty response"));
    }

    #[tokio::test]
    async fn test_prose_without_json_is_parse_failure() {
        let err = pipeline(FixedBackend::ok("Sorry, I cannot help with that."))
            .run("article")
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::Parsing);
        assert!(matches!(err.source, ExtractError::JsonNotFound));
    }

    #[tokio::test]
    async fn test_schema_violation_stage() {
        let err = pipeline(FixedBackend::ok(r#"{"citation": {"journal": {"name": "J"}}}"#))
            .run("article")
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::Validation);
        assert!(err.to_string().contains("citation.title"));
    }

    #[tokio::test]
    async fn test_debug_artifacts_written() {
        let tmp = tempfile::TempDir::new().unwrap();
        let pipeline = ExtractionPipeline::new(
            FixedBackend::ok(VALID),
            DebugSink::new(Some(tmp.path().to_path_buf())),
        );
        pipeline.run("article").await.unwrap();

        let names: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert!(names.iter().any(|n| n == crate::debug_log::DEBUG_LOG_FILE));
        assert!(names.iter().any(|n| n.starts_with("llm_response_")));
    }
}
