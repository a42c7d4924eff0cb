//! Integration tests for the chat model clients
//!
//! Validates request shaping and error triage for the
//! OpenAI-compatible and native Gemini clients using mock servers.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use finchat_engine::llm::{gemini::GeminiClient, openai::OpenAiCompatClient, ChatModel, LLMError, Message};

#[tokio::test]
async fn test_openai_client_completes() {
    let server = MockServer::start().await;

    let body = json!({
        "choices": [
            { "message": { "role": "assistant", "content": "Bonds look steady." } }
        ]
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gemini-2.0-flash-exp",
            "messages": [
                { "role": "system", "content": "You are terse." },
                { "role": "user", "content": "How are bonds doing?" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let client = OpenAiCompatClient::new(server.uri(), "gemini-2.0-flash-exp", "test-key");
    let reply = client
        .complete("You are terse.", &[Message::user("How are bonds doing?")])
        .await
        .unwrap();

    assert_eq!(reply, "Bonds look steady.");
}

#[tokio::test]
async fn test_openai_client_auth_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = OpenAiCompatClient::new(server.uri(), "m", "bad-key");
    let err = client.complete("sys", &[Message::user("hi")]).await.unwrap_err();

    assert!(matches!(err, LLMError::AuthenticationFailed(_)));
}

#[tokio::test]
async fn test_openai_client_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = OpenAiCompatClient::new(server.uri(), "m", "k");
    let err = client.complete("sys", &[Message::user("hi")]).await.unwrap_err();

    assert!(matches!(err, LLMError::RateLimitExceeded));
}

#[tokio::test]
async fn test_openai_client_rejects_empty_choices() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let client = OpenAiCompatClient::new(server.uri(), "m", "k");
    let err = client.complete("sys", &[Message::user("hi")]).await.unwrap_err();

    assert!(matches!(err, LLMError::ParseError(_)));
}

#[tokio::test]
async fn test_gemini_client_completes() {
    let server = MockServer::start().await;

    let body = json!({
        "candidates": [
            {
                "content": {
                    "parts": [
                        { "text": "Markets closed " },
                        { "text": "mixed today." }
                    ]
                }
            }
        ]
    });

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash-exp:generateContent"))
        .and(body_partial_json(json!({
            "systemInstruction": { "parts": [{ "text": "Be brief." }] }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let client = GeminiClient::new(server.uri(), "gemini-2.0-flash-exp", "test-key");
    let reply = client
        .complete(
            "Be brief.",
            &[
                Message::user("How did markets do?"),
                Message::assistant("Checking."),
                Message::user("And?"),
            ],
        )
        .await
        .unwrap();

    // Multi-part candidates concatenate
    assert_eq!(reply, "Markets closed mixed today.");
}

#[tokio::test]
async fn test_gemini_client_provider_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = GeminiClient::new(server.uri(), "m", "k");
    let err = client.complete("sys", &[Message::user("hi")]).await.unwrap_err();

    assert!(matches!(err, LLMError::ProviderUnavailable(_)));
}
