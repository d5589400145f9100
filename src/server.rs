//! HTTP service exposing the extraction pipeline.
//!
//! - `POST /extract_metadata` with `{"text": "..."}` returns the validated record
//! - `GET /health` returns `OK`

use crate::error::ExtractError;
use crate::pipeline::ExtractionPipeline;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

pub const MISSING_TEXT: &str = "Missing 'text' in request body.";
const NOT_AN_OBJECT: &str = "Request body must be a JSON object.";

struct AppState {
    pipeline: ExtractionPipeline,
}

/// Build the service router around a ready pipeline.
pub fn router(pipeline: ExtractionPipeline) -> Router {
    let app_state = Arc::new(AppState { pipeline });

    Router::new()
        .route("/health", get(health_handler))
        .route("/extract_metadata", post(extract_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

pub async fn run_server(host: &str, port: u16, pipeline: ExtractionPipeline) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, router(pipeline))
        .await
        .context("Server error")?;

    Ok(())
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

fn client_error(error: ExtractError) -> Response {
    let message = match error {
        ExtractError::Input(message) => message,
        other => other.to_string(),
    };
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// Pull a non-blank `text` out of the request body.
fn request_text(body: &[u8]) -> crate::Result<String> {
    let value: Value =
        serde_json::from_slice(body).map_err(|_| ExtractError::Input(NOT_AN_OBJECT.to_string()))?;
    if !value.is_object() {
        return Err(ExtractError::Input(NOT_AN_OBJECT.to_string()));
    }

    value
        .get("text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ExtractError::Input(MISSING_TEXT.to_string()))
}

/// Extraction endpoint handler
async fn extract_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let text = match request_text(&body) {
        Ok(text) => text,
        Err(e) => return client_error(e),
    };

    match state.pipeline.run(&text).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => {
            error!(stage = %e.stage, error = %e, "Extraction failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string(), "stage": e.stage.as_str() })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::ChatCompletionClient;
    use crate::config::LlmConfig;
    use crate::debug_log::DebugSink;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use mockito::{Server, ServerGuard};
    use std::time::Duration;
    use tower::ServiceExt;

    fn app_for(server: &ServerGuard) -> Router {
        let config = LlmConfig::new(server.url(), "sk-test", "test-model");
        let client = ChatCompletionClient::new(config)
            .unwrap()
            .with_retry_delay(Duration::ZERO);
        router(ExtractionPipeline::new(Arc::new(client), DebugSink::default()))
    }

    fn completion_body(content: &str) -> String {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]}).to_string()
    }

    async fn post_json(app: Router, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/extract_metadata")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_request_text_errors_are_input_errors() {
        assert_eq!(request_text(br#"{"text": "  article  "}"#).unwrap(), "article");
        let bodies: [&[u8]; 4] = [b"{}", br#"{"text": null}"#, b"[1]", b"{"];
        for body in bodies {
            assert!(matches!(request_text(body), Err(ExtractError::Input(_))));
        }
        match request_text(b"{}") {
            Err(ExtractError::Input(message)) => assert_eq!(message, MISSING_TEXT),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_text_is_client_error() {
        let server = Server::new_async().await;
        let (status, body) = post_json(app_for(&server), "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], MISSING_TEXT);
    }

    #[tokio::test]
    async fn test_blank_text_and_bad_bodies_are_client_errors() {
        let server = Server::new_async().await;
        for body in [r#"{"text": "   "}"#, r#"{"text": 42}"#, "not json", "[]"] {
            let (status, body) = post_json(app_for(&server), body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_completion_outage_names_stage() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .expect(2)
            .create_async()
            .await;

        let (status, body) = post_json(app_for(&server), r#"{"text": "article"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["stage"], "completion");
        assert!(body["error"].as_str().unwrap().starts_with("completion failed"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fenced_completion_is_accepted() {
        let mut server = Server::new_async().await;
        let content = "```json\n{\"citation\": {\"title\": \"T\", \"authors\": [], \"journal\": {\"name\": \"J\"}, \"keywords\": [], \"subject_classifications\": []}, \"datasets\": []}\n```";
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(completion_body(content))
            .create_async()
            .await;

        let (status, body) = post_json(app_for(&server), r#"{"text": "article"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["citation"]["title"], "T");
        assert_eq!(body["datasets"], json!([]));
    }

    #[tokio::test]
    async fn test_missing_required_field_names_path() {
        let mut server = Server::new_async().await;
        let content = r#"{"citation": {"authors": [], "journal": {"name": "J"}}, "datasets": []}"#;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(completion_body(content))
            .create_async()
            .await;

        let (status, body) = post_json(app_for(&server), r#"{"text": "article"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["stage"], "validation");
        assert!(body["error"].as_str().unwrap().contains("citation.title"));
    }

    #[tokio::test]
    async fn test_undeclared_field_is_rejected() {
        let mut server = Server::new_async().await;
        let content = r#"{"citation": {"title": "T", "journal": {"name": "J"}}, "datasets": [], "foo": "bar"}"#;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(completion_body(content))
            .create_async()
            .await;

        let (status, body) = post_json(app_for(&server), r#"{"text": "article"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["stage"], "validation");
        assert!(body["error"].as_str().unwrap().contains("foo"));
    }

    #[tokio::test]
    async fn test_empty_completion_fails_parsing() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(completion_body(""))
            .create_async()
            .await;

        let (status, body) = post_json(app_for(&server), r#"{"text": "article"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["stage"], "parsing");
        assert!(body["error"].as_str().unwrap().contains("empty response"));
    }

    #[tokio::test]
    async fn test_health() {
        let server = Server::new_async().await;
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app_for(&server).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }
}
