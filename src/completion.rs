//! Client for OpenAI-compatible chat completion endpoints.
//!
//! One call sends the instruction as the system message and the article text
//! as the user message and returns the assistant's reply. Transient failures
//! (transport errors, timeouts, HTTP 429 and 5xx) are retried a bounded
//! number of times; everything else fails at once.

use crate::config::{LlmConfig, MAX_RETRIES_LIMIT};
use crate::error::{ExtractError, OptionExt, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connect timeout, independent of the overall request timeout
const CONNECT_TIMEOUT_SECS: u64 = 60;

/// Pause between attempts
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Anything that can turn an instruction and a document into completion text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// `Ok("")` is a successful empty completion; failures are always `Err`.
    async fn complete(&self, instruction: &str, content: &str) -> Result<String>;
}

/// OpenAI-compatible API response structures
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

/// One server-sent event of a streamed completion
#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

fn log_usage(usage: &ApiUsage) {
    info!(
        prompt_tokens = usage.prompt_tokens,
        completion_tokens = usage.completion_tokens,
        total_tokens = usage.total_tokens,
        "Completion token usage"
    );
}

/// HTTP completion client
pub struct ChatCompletionClient {
    client: reqwest::Client,
    config: LlmConfig,
    retry_delay: Duration,
}

impl ChatCompletionClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ExtractError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    /// Override the pause between attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn max_attempts(&self) -> u32 {
        1 + self.config.max_retries.min(MAX_RETRIES_LIMIT)
    }

    async fn send_once(&self, body: &Value) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExtractError::Api {
                code: status.as_u16() as i32,
                message: format!("LLM API error: {} - {}", status, error_text),
            });
        }

        if self.config.stream {
            read_event_stream(response).await
        } else {
            read_json_body(response).await
        }
    }
}

async fn read_json_body(response: reqwest::Response) -> Result<String> {
    // Transport failures while reading the body stay `Network` and are retried
    let raw = response.text().await?;
    let api_response: ChatCompletionResponse = serde_json::from_str(&raw)
        .map_err(|e| ExtractError::Parse(format!("Failed to parse LLM response: {}", e)))?;

    if let Some(usage) = &api_response.usage {
        log_usage(usage);
    }

    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_parse("LLM response has no choices")?;

    Ok(choice.message.content.unwrap_or_default())
}

/// Concatenate `choices[0].delta.content` of every event until `[DONE]`.
async fn read_event_stream(response: reqwest::Response) -> Result<String> {
    let mut stream = response.bytes_stream();
    let mut pending: Vec<u8> = Vec::new();
    let mut content = String::new();

    while let Some(chunk) = stream.next().await {
        pending.extend_from_slice(&chunk?);

        while let Some(newline) = pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = pending.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            if apply_event_line(line.trim(), &mut content)? {
                return Ok(content);
            }
        }
    }

    // Servers may close the stream without a trailing newline or `[DONE]`
    let rest = String::from_utf8_lossy(&pending);
    apply_event_line(rest.trim(), &mut content)?;
    Ok(content)
}

/// Returns true once the terminating event has been seen.
fn apply_event_line(line: &str, content: &mut String) -> Result<bool> {
    let Some(payload) = line.strip_prefix("data:") else {
        return Ok(false);
    };
    let payload = payload.trim();
    if payload == "[DONE]" {
        return Ok(true);
    }
    if payload.is_empty() {
        return Ok(false);
    }

    let chunk: ChatCompletionChunk = serde_json::from_str(payload)
        .map_err(|e| ExtractError::Parse(format!("Failed to parse stream event: {}", e)))?;
    if let Some(usage) = &chunk.usage {
        log_usage(usage);
    }
    if let Some(fragment) = chunk.choices.first().and_then(|c| c.delta.content.as_deref()) {
        content.push_str(fragment);
    }
    Ok(false)
}

#[async_trait]
impl CompletionBackend for ChatCompletionClient {
    async fn complete(&self, instruction: &str, content: &str) -> Result<String> {
        let mut request_body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": instruction},
                {"role": "user", "content": content}
            ],
            "temperature": 0.1
        });
        if self.config.stream {
            request_body["stream"] = Value::Bool(true);
        }

        let max_attempts = self.max_attempts();
        let mut attempt = 1;
        loop {
            debug!(attempt, model = %self.config.model, chars = content.len(), "Sending completion request");
            match self.send_once(&request_body).await {
                Ok(text) => {
                    debug!(attempt, chars = text.len(), "Completion received");
                    return Ok(text);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    warn!(
                        attempt,
                        max_attempts,
                        wait_ms = self.retry_delay.as_millis() as u64,
                        error = %e,
                        "Completion request failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
