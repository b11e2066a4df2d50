//! Gateway client against a mock backend.

mod common;

use common::{client_for, InstantSleeper, MockBackend};
use generation_gateway::types::IdSource;
use generation_gateway::{Error, ErrorCategory, GenerationMode, GenerationRequest, GenerationState};
use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

fn request() -> GenerationRequest {
    GenerationRequest::new("blog-post", "conversational").with_topic("Rust error handling")
}

#[tokio::test]
async fn submit_returns_trimmed_content_and_backend_id() {
    let mut backend = MockBackend::new().await;
    let mock = backend
        .server
        .mock("POST", "/api/generate")
        .match_header("x-generation-mode", "standard")
        .match_header("x-request-id", Matcher::Regex(r"^[0-9a-f-]{36}$".to_string()))
        .match_body(Matcher::PartialJson(json!({
            "template": "blog-post",
            "style_profile": "conversational",
            "topic": "Rust error handling",
            "audience": "general",
            "tone": "professional",
            "generation_mode": "standard",
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"generation_id": "gen-42", "content": "  Hello world  ", "status": "completed"}"#)
        .expect(1)
        .create_async()
        .await;

    let result = assert_ok!(backend.client().submit(&request()).await);

    mock.assert_async().await;
    assert!(result.success);
    assert_eq!(result.content, "Hello world");
    assert_eq!(result.generation_id, "gen-42");
    assert_eq!(result.id_source(), Some(IdSource::Backend));
    assert_eq!(result.metadata["attempts"], json!(1));
    assert_eq!(result.metadata["template"], json!("blog-post"));
    assert!(result.metadata.contains_key("processing_time_ms"));
    assert!(backend.recorded_delays().is_empty());
}

#[tokio::test]
async fn nested_content_and_local_id() {
    let mut backend = MockBackend::new().await;
    let _mock = backend
        .server
        .mock("POST", "/api/generate")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"final_state": {"draft": "Deep article"}}"#)
        .create_async()
        .await;

    let result = assert_ok!(backend.client().submit(&request()).await);

    assert_eq!(result.content, "Deep article");
    assert_eq!(result.id_source(), Some(IdSource::Local));
    assert!(!result.generation_id.is_empty());
}

#[tokio::test]
async fn plain_text_body_is_the_content() {
    let mut backend = MockBackend::new().await;
    let _mock = backend
        .server
        .mock("POST", "/api/generate")
        .with_status(200)
        .with_header("content-type", "text/plain")
        .with_body("Just the article text")
        .create_async()
        .await;

    let result = assert_ok!(backend.client().submit(&request()).await);
    assert_eq!(result.content, "Just the article text");
}

#[tokio::test]
async fn missing_template_never_reaches_the_network() {
    let mut backend = MockBackend::new().await;
    let mock = backend
        .server
        .mock("POST", "/api/generate")
        .expect(0)
        .create_async()
        .await;

    let err = backend
        .client()
        .submit(&GenerationRequest::new("", "conversational"))
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, Error::Validation { .. }));
    assert_eq!(err.http_status(), 400);
}

#[tokio::test]
async fn server_errors_are_retried_with_backoff() {
    let mut backend = MockBackend::new().await;
    let mock = backend
        .server
        .mock("POST", "/api/generate")
        .with_status(503)
        .with_header("content-type", "application/json")
        .with_body(r#"{"detail": "backend overloaded"}"#)
        .expect(3)
        .create_async()
        .await;

    let err = assert_err!(backend.client().submit(&request()).await);

    mock.assert_async().await;
    match &err {
        Error::Backend { status, message, .. } => {
            assert_eq!(*status, 503);
            assert_eq!(message, "backend overloaded");
        }
        other => panic!("expected backend error, got {other:?}"),
    }
    assert_eq!(err.attempts(), Some(3));
    assert_eq!(
        backend.recorded_delays(),
        vec![Duration::from_secs(2), Duration::from_secs(4)]
    );
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let mut backend = MockBackend::new().await;
    let mock = backend
        .server
        .mock("POST", "/api/generate")
        .with_status(404)
        .with_body(r#"{"detail": "template not found"}"#)
        .expect(1)
        .create_async()
        .await;

    let err = assert_err!(backend.client().submit(&request()).await);

    mock.assert_async().await;
    assert_eq!(err.http_status(), 404);
    assert_eq!(err.attempts(), Some(1));
}

#[tokio::test]
async fn malformed_json_is_a_parse_error_without_retry() {
    let mut backend = MockBackend::new().await;
    let mock = backend
        .server
        .mock("POST", "/api/generate")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"content": "#)
        .expect(1)
        .create_async()
        .await;

    let err = assert_err!(backend.client().submit(&request()).await);

    mock.assert_async().await;
    assert!(matches!(err, Error::Parse { .. }));
}

#[tokio::test]
async fn connection_refused_is_network_and_retried() {
    let sleeper = Arc::new(InstantSleeper::default());
    let client = client_for("http://127.0.0.1:1", sleeper.clone());

    let err = client.submit(&request()).await.unwrap_err();

    assert_eq!(err.category(), Some(ErrorCategory::Network));
    assert_eq!(err.attempts(), Some(3));
    assert_eq!(sleeper.delays.lock().unwrap().len(), 2);
    assert_eq!(err.http_status(), 503);
}

#[tokio::test]
async fn status_falls_back_to_next_endpoint() {
    let mut backend = MockBackend::new().await;
    let first = backend
        .server
        .mock("GET", "/api/status/gen-7")
        .with_status(404)
        .create_async()
        .await;
    let second = backend
        .server
        .mock("GET", "/api/generation/gen-7")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status": "processing", "progress": 40.4}"#)
        .create_async()
        .await;

    let snapshot = backend.client().status("gen-7").await.unwrap();

    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(snapshot.state, GenerationState::Processing);
    assert_eq!(snapshot.progress, Some(40));
    assert_eq!(snapshot.endpoint, "/api/generation/gen-7");
}

#[tokio::test]
async fn status_rejects_unsafe_ids() {
    let backend = MockBackend::new().await;
    let err = backend.client().status("../admin").await.unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
}

#[tokio::test]
async fn cancel_reports_acknowledgement() {
    let mut backend = MockBackend::new().await;
    let _ok = backend
        .server
        .mock("DELETE", "/api/generation/gen-1")
        .with_status(200)
        .create_async()
        .await;
    let _refused = backend
        .server
        .mock("DELETE", "/api/generation/gen-2")
        .with_status(409)
        .create_async()
        .await;

    let client = backend.client();
    assert!(client.cancel("gen-1").await.backend_acknowledged);
    assert!(!client.cancel("gen-2").await.backend_acknowledged);
}

#[tokio::test]
async fn tracked_standard_submission_has_no_channel() {
    let mut backend = MockBackend::new().await;
    let _mock = backend
        .server
        .mock("POST", "/api/generate")
        .with_status(200)
        .with_body(r#"{"id": "gen-9", "content": "done"}"#)
        .create_async()
        .await;

    let submission = backend.client().submit_tracked(&request()).await.unwrap();
    assert!(submission.progress.is_none());
    assert!(submission.channel_error.is_none());
    assert_eq!(submission.result.generation_id, "gen-9");
}

#[tokio::test]
async fn tracked_async_submission_survives_channel_failure() {
    let mut backend = MockBackend::new().await;
    let _mock = backend
        .server
        .mock("POST", "/api/generate")
        .match_header("x-generation-mode", "async")
        .with_status(200)
        .with_body(r#"{"generation_id": "gen-10", "status": "queued"}"#)
        .create_async()
        .await;

    // mockito does not speak WebSocket, so the upgrade fails.
    let submission = backend
        .client()
        .submit_tracked(&request().with_mode(GenerationMode::Async))
        .await
        .unwrap();

    assert_eq!(submission.result.generation_id, "gen-10");
    assert!(submission.progress.is_none());
    assert!(submission.channel_error.is_some());
}
