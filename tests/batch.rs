//! Batch submission against a mock backend.

mod common;

use common::MockBackend;
use generation_gateway::{BatchSlot, GenerationRequest};
use mockito::Matcher;
use serde_json::json;

#[tokio::test]
async fn one_failing_item_does_not_abort_the_batch() {
    let mut backend = MockBackend::new().await;
    let _ok = backend
        .server
        .mock("POST", "/api/generate")
        .match_body(Matcher::PartialJson(json!({"template": "good"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"content": "article"}"#)
        .expect(2)
        .create_async()
        .await;
    let _bad = backend
        .server
        .mock("POST", "/api/generate")
        .match_body(Matcher::PartialJson(json!({"template": "missing"})))
        .with_status(404)
        .with_body(r#"{"detail": "template not found"}"#)
        .expect(1)
        .create_async()
        .await;

    let status = backend
        .client()
        .submit_batch(vec![
            GenerationRequest::new("good", "formal"),
            GenerationRequest::new("missing", "formal"),
            GenerationRequest::new("good", "casual"),
        ])
        .await;

    assert!(status.is_terminal());
    assert_eq!(status.total_count, 3);
    assert_eq!(status.completed_count, 2);
    assert!(matches!(&status.results[0], BatchSlot::Resolved(r) if r.content == "article"));
    assert!(matches!(&status.results[1], BatchSlot::Failed(m) if m.contains("template not found")));
    assert!(matches!(&status.results[2], BatchSlot::Resolved(_)));
    assert_eq!(status.errors.len(), 1);
    assert_eq!(status.errors[0].index, 1);
}

#[tokio::test]
async fn validation_failures_are_item_errors() {
    let backend = MockBackend::new().await;
    let status = backend
        .client()
        .submit_batch(vec![GenerationRequest::new("", "formal")])
        .await;
    assert_eq!(status.completed_count, 0);
    assert!(status.errors[0].category.is_none());
    assert!(status.errors[0].message.contains("template is required"));
}
