//! Wire-level tests for the Google AI / Vertex AI client.

#![cfg(feature = "google")]

use futures_util::StreamExt;
use genai_meter::providers::GenerativeProvider;
use genai_meter::{Content, GoogleClient, MeterError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user(text: &str) -> Vec<Content> {
    vec![Content::user(text)]
}

#[tokio::test]
async fn generate_posts_contents_with_api_key_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash-001:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "Hello"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hi "}, {"text": "there"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 2, "totalTokenCount": 5},
            "modelVersion": "gemini-2.0-flash-001"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = GoogleClient::google("test-key").with_base_url(mock_server.uri());
    let response = client
        .generate("gemini-2.0-flash-001", &user("Hello"))
        .await
        .unwrap();

    assert_eq!(response.output_text(), "Hi there");
    assert_eq!(
        response.first_candidate().unwrap().finish_reason.as_deref(),
        Some("STOP")
    );
    let usage = response.usage_metadata.unwrap();
    assert_eq!(usage.prompt_token_count, Some(3.0));
    assert_eq!(usage.total_token_count, Some(5.0));
}

#[tokio::test]
async fn models_prefix_is_accepted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-pro:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = GoogleClient::google("k").with_base_url(mock_server.uri());
    let response = client.generate("models/gemini-pro", &user("x")).await.unwrap();
    assert!(response.candidates.is_empty());
}

#[tokio::test]
async fn stream_parses_server_sent_events() {
    let mock_server = MockServer::start().await;

    let body = concat!(
        "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"Once \"}]}}]}\n\n",
        "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"upon\"}]}}]}\n\n",
        "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\" a time\"}]},\"finishReason\":\"STOP\"}],",
        "\"usageMetadata\":{\"promptTokenCount\":4,\"candidatesTokenCount\":5,\"totalTokenCount\":9}}\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash-001:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = GoogleClient::google("test-key").with_base_url(mock_server.uri());
    let chunks: Vec<_> = client
        .generate_stream("gemini-2.0-flash-001", &user("Tell me a story"))
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(chunks.len(), 3);
    let text: String = chunks
        .iter()
        .map(|chunk| chunk.as_ref().unwrap().output_text())
        .collect();
    assert_eq!(text, "Once upon a time");

    let last = chunks.last().unwrap().as_ref().unwrap();
    assert_eq!(
        last.usage_metadata.as_ref().unwrap().total_token_count,
        Some(9.0)
    );
}

#[tokio::test]
async fn stream_surfaces_malformed_event_as_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/m:streamGenerateContent"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string("data: {\"candidates\":[]}\n\ndata: not json\n\n"),
        )
        .mount(&mock_server)
        .await;

    let client = GoogleClient::google("k").with_base_url(mock_server.uri());
    let chunks: Vec<_> = client
        .generate_stream("m", &user("x"))
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].is_ok());
    assert!(matches!(chunks[1], Err(MeterError::Json(_))));
}

#[tokio::test]
async fn google_embed_uses_embed_content() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/text-embedding-004:embedContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({"content": {"parts": [{"text": "hello world"}]}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embedding": {"values": [0.1, 0.2, 0.3]}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = GoogleClient::google("test-key").with_base_url(mock_server.uri());
    let response = client.embed("text-embedding-004", "hello world").await.unwrap();

    assert_eq!(response.values.len(), 3);
    assert!(response.usage_metadata.is_none());
}

#[tokio::test]
async fn vertex_embed_uses_predict_with_bearer_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/text-embedding-004:predict"))
        .and(header("authorization", "Bearer ya29.token"))
        .and(body_partial_json(json!({"instances": [{"content": "hello world"}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [{
                "embeddings": {"values": [0.5, 0.25], "statistics": {"token_count": 2}}
            }],
            "deployedModelId": "dep-1"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = GoogleClient::vertex("proj", "us-central1", "ya29.token")
        .with_base_url(mock_server.uri());
    let response = client.embed("text-embedding-004", "hello world").await.unwrap();

    assert_eq!(response.values, vec![0.5, 0.25]);
    assert_eq!(response.model_version.as_deref(), Some("dep-1"));
    let usage = response.usage_metadata.unwrap();
    assert_eq!(usage.prompt_token_count, Some(2.0));
    assert_eq!(usage.total_token_count, Some(2.0));
}

#[tokio::test]
async fn vertex_embed_without_predictions_is_empty_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"predictions": []})))
        .mount(&mock_server)
        .await;

    let client = GoogleClient::vertex("p", "l", "t").with_base_url(mock_server.uri());
    let err = client.embed("m", "x").await.unwrap_err();
    assert!(matches!(err, MeterError::EmptyResponse));
}

#[tokio::test]
async fn http_errors_map_to_typed_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/denied:generateContent"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/missing:generateContent"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such model"))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/broken:generateContent"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&mock_server)
        .await;

    let client = GoogleClient::google("k").with_base_url(mock_server.uri());

    let err = client.generate("denied", &user("x")).await.unwrap_err();
    assert!(matches!(err, MeterError::AuthenticationFailed));

    let err = client.generate("missing", &user("x")).await.unwrap_err();
    assert!(matches!(err, MeterError::ModelNotFound(_)));

    let err = client.generate("broken", &user("x")).await.unwrap_err();
    match err {
        MeterError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "internal");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}
