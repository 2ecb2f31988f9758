use std::time::Duration;

use healthai_core::{CompletionError, GroqClient};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn success_body(text: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": "mixtral-8x7b-32768",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": text}, "finish_reason": "stop"},
            {"index": 1, "message": {"role": "assistant", "content": "second choice"}, "finish_reason": "stop"}
        ]
    })
}

#[tokio::test]
async fn test_success_returns_first_choice() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer gsk_valid"))
        .and(body_partial_json(json!({
            "model": "mixtral-8x7b-32768",
            "max_tokens": 1024,
            "messages": [{"role": "user", "content": "Plan my week"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("Here is your plan")))
        .expect(1)
        .mount(&server)
        .await;

    let client = GroqClient::new("gsk_valid").with_base_url(&server.uri());
    let text = client.complete("Plan my week").await.unwrap();
    assert_eq!(text, "Here is your plan");
}

#[tokio::test]
async fn test_invalid_key_is_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-your-key"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Invalid API Key", "type": "invalid_request_error", "code": "invalid_api_key"}
        })))
        .mount(&server)
        .await;

    let client = GroqClient::new("sk-your-key").with_base_url(&server.uri());
    let err = client.complete("hello").await.unwrap_err();

    assert!(matches!(err, CompletionError::Unauthorized { status: 401, .. }));
    let message = err.to_string();
    assert!(!message.is_empty());
    assert!(message.contains("Invalid API Key"));
}

#[tokio::test]
async fn test_rate_limit_and_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("authorization", "Bearer gsk_limited"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer gsk_broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let limited = GroqClient::new("gsk_limited").with_base_url(&server.uri());
    let err = limited.complete("hi").await.unwrap_err();
    assert!(matches!(err, CompletionError::RateLimited(ref m) if m == "Too Many Requests"));

    let broken = GroqClient::new("gsk_broken").with_base_url(&server.uri());
    let err = broken.complete("hi").await.unwrap_err();
    assert!(matches!(err, CompletionError::Provider { status: 500, .. }));
    assert!(!err.to_string().is_empty());
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success_body("too late"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = GroqClient::new("gsk_valid")
        .with_base_url(&server.uri())
        .with_timeout(Duration::from_millis(200));
    let err = client.complete("hi").await.unwrap_err();
    assert!(matches!(err, CompletionError::Timeout(_)));
}

#[tokio::test]
async fn test_unreachable_provider_is_transport_error() {
    // Nothing listens on port 1.
    let client = GroqClient::new("gsk_valid").with_base_url("http://127.0.0.1:1");
    let err = client.complete("hi").await.unwrap_err();
    assert!(matches!(err, CompletionError::Transport(_)));
    assert!(!err.to_string().is_empty());
}

#[tokio::test]
async fn test_malformed_and_empty_bodies() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("authorization", "Bearer gsk_garbage"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer gsk_empty"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let garbage = GroqClient::new("gsk_garbage").with_base_url(&server.uri());
    assert!(matches!(
        garbage.complete("hi").await,
        Err(CompletionError::MalformedResponse(_))
    ));

    let empty = GroqClient::new("gsk_empty").with_base_url(&server.uri());
    assert!(matches!(
        empty.complete("hi").await,
        Err(CompletionError::EmptyResponse)
    ));
}

#[tokio::test]
async fn test_null_or_blank_content_is_empty_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("authorization", "Bearer gsk_null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer gsk_blank"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "  \n"}}]
        })))
        .mount(&server)
        .await;

    let null = GroqClient::new("gsk_null").with_base_url(&server.uri());
    assert!(matches!(
        null.complete("hi").await,
        Err(CompletionError::EmptyResponse)
    ));

    let blank = GroqClient::new("gsk_blank").with_base_url(&server.uri());
    assert!(matches!(
        blank.complete("hi").await,
        Err(CompletionError::EmptyResponse)
    ));
}

#[tokio::test]
async fn test_model_override_is_sent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"model": "llama-3.1-8b-instant"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let client = GroqClient::new("gsk_valid")
        .with_base_url(&server.uri())
        .with_model("llama-3.1-8b-instant");
    assert_eq!(client.complete("hi").await.unwrap(), "ok");
}
