// libs/assistant-cell/tests/gateway_test.rs
use std::sync::Arc;

use assert_matches::assert_matches;
use axum::extract::State;
use axum::Json;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use assistant_cell::handlers::{analyze_report, chat};
use assistant_cell::models::{AnalyzeReportRequest, ChatRequest};
use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::test_utils::TestConfig;

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content } }
        ]
    })
}

#[tokio::test]
async fn chat_forwards_the_message_and_wraps_the_reply() {
    let server = MockServer::start().await;
    let state = TestConfig::with_mock_server(&server.uri()).to_arc();

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-openai-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "messages": [
                {},
                { "role": "user", "content": "Is 8 hours of sleep enough?" }
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("Generally yes, for most adults.")),
        )
        .mount(&server)
        .await;

    let Json(body) = chat(
        State(state),
        Json(ChatRequest {
            message: "Is 8 hours of sleep enough?".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(body.response, "Generally yes, for most adults.");
    assert_matches!(&body.message, assistant_cell::models::ChatMessage::Persisted { .. });
    assert_eq!(body.message.content(), "Generally yes, for most adults.");
}

#[tokio::test]
async fn chat_rejects_an_empty_message_without_calling_upstream() {
    let server = MockServer::start().await;
    let state = TestConfig::with_mock_server(&server.uri()).to_arc();

    let result = chat(
        State(state),
        Json(ChatRequest {
            message: "   ".to_string(),
        }),
    )
    .await;

    assert_matches!(result, Err(AppError::ValidationError(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn upstream_failure_surfaces_as_an_external_service_error() {
    let server = MockServer::start().await;
    let state = TestConfig::with_mock_server(&server.uri()).to_arc();

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let result = chat(
        State(state),
        Json(ChatRequest {
            message: "hello".to_string(),
        }),
    )
    .await;

    assert_matches!(result, Err(AppError::ExternalService(_)));
}

#[tokio::test]
async fn missing_api_key_means_the_assistant_is_not_configured() {
    let state = Arc::new(AppConfig {
        supabase_url: "http://localhost:54321".to_string(),
        supabase_anon_key: "anon".to_string(),
        supabase_jwt_secret: "secret".to_string(),
        openai_api_key: String::new(),
        openai_base_url: "http://localhost:54322/v1".to_string(),
    });

    let result = chat(
        State(state),
        Json(ChatRequest {
            message: "hello".to_string(),
        }),
    )
    .await;

    assert_matches!(result, Err(AppError::Internal(_)));
}

#[tokio::test]
async fn report_analysis_prefixes_the_content_for_the_upstream() {
    let server = MockServer::start().await;
    let state = TestConfig::with_mock_server(&server.uri()).to_arc();

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [
                {},
                { "content": "Analyze this blood test report:\n\nHemoglobin: 11.2 g/dL" }
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("Hemoglobin is slightly low.")),
        )
        .mount(&server)
        .await;

    let Json(body) = analyze_report(
        State(state),
        Json(AnalyzeReportRequest {
            content: "Hemoglobin: 11.2 g/dL".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(body.analysis, "Hemoglobin is slightly low.");
}

#[tokio::test]
async fn report_analysis_rejects_empty_content() {
    let server = MockServer::start().await;
    let state = TestConfig::with_mock_server(&server.uri()).to_arc();

    let result = analyze_report(
        State(state),
        Json(AnalyzeReportRequest {
            content: String::new(),
        }),
    )
    .await;

    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn malformed_completions_are_reported_as_upstream_errors() {
    let server = MockServer::start().await;
    let state = TestConfig::with_mock_server(&server.uri()).to_arc();

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let result = chat(
        State(state),
        Json(ChatRequest {
            message: "hello".to_string(),
        }),
    )
    .await;

    assert_matches!(result, Err(AppError::ExternalService(_)));
}
