//! Tests for the metered gateway's chat and embed operations.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use genai_meter::providers::{ChunkStream, GenerativeProvider};
use genai_meter::{
    CallerMetadata, Content, EmbedResponse, GenerateResponse, MemorySink, Meter, MeterError,
    MeteredGateway, MeteringSink, OperationKind, ProviderFlavor, Result, StopReason,
    TelemetryRecord,
};
use serde_json::json;

// ============================================================================
// Mocks
// ============================================================================

/// Echoes the last user message and counts calls.
#[derive(Default)]
struct EchoProvider {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl GenerativeProvider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, _model: &str, contents: &[Content]) -> Result<GenerateResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(MeterError::Api {
                status: 500,
                message: "backend unavailable".into(),
            });
        }
        let last = contents.last().map(Content::joined_text).unwrap_or_default();
        Ok(serde_json::from_value(json!({
            "modelVersion": "gemini-2.0-flash-001",
            "responseId": format!("resp-{}", contents.len()),
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": format!("echo: {last}") }] },
                "finishReason": "MAX_TOKENS",
                "avgLogprobs": -0.05
            }],
            "usageMetadata": {
                "promptTokenCount": contents.len(),
                "candidatesTokenCount": 3,
                "totalTokenCount": contents.len() + 3
            }
        }))?)
    }

    async fn generate_stream(&self, _model: &str, _contents: &[Content]) -> Result<ChunkStream> {
        Err(MeterError::InvalidInput("not used".into()))
    }

    async fn embed(&self, _model: &str, text: &str) -> Result<EmbedResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(EmbedResponse {
            values: vec![0.0; text.len()],
            model_version: None,
            usage_metadata: None,
        })
    }
}

/// Sink that panics on every record.
struct ExplodingSink;

#[async_trait]
impl MeteringSink for ExplodingSink {
    async fn send(&self, _record: &TelemetryRecord) {
        panic!("metering backend exploded");
    }
}

fn gateway(provider: Arc<EchoProvider>) -> (MeteredGateway, MemorySink) {
    let sink = MemorySink::new();
    let gateway = Meter::builder()
        .provider_arc(provider)
        .sink(sink.clone())
        .build()
        .unwrap();
    (gateway, sink)
}

// ============================================================================
// Chat
// ============================================================================

#[tokio::test]
async fn test_chat_produces_one_record_per_prompt() {
    let provider = Arc::new(EchoProvider::default());
    let (gateway, sink) = gateway(Arc::clone(&provider));

    let transcript = gateway
        .chat("gemini-2.0-flash-001", &["hello", "how are you", "bye"], None)
        .await
        .unwrap();
    gateway.drain().await;

    assert_eq!(transcript.responses.len(), 3);
    assert_eq!(transcript.responses[0].text, "echo: hello");
    assert_eq!(transcript.responses[2].text, "echo: bye");
    assert_eq!(
        transcript.histories,
        vec!["hello", "echo: hello", "how are you", "echo: how are you", "bye", "echo: bye"]
    );
    // later turns carry the conversation so far
    assert_eq!(transcript.responses[1].usage_metadata.prompt_token_count, 3);

    let records = sink.records();
    assert_eq!(records.len(), 3);
    let mut ids: Vec<_> = records.iter().map(|r| r.transaction_id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3, "transaction ids must be unique");
    for record in &records {
        assert_eq!(record.operation_type, OperationKind::Chat);
        assert_eq!(record.stop_reason, StopReason::TokenLimit);
        assert_eq!(record.model, "gemini-2.0-flash-001");
        assert!(!record.is_streamed);
        assert!(record.response_quality_score.is_some());
    }
}

#[tokio::test]
async fn test_chat_applies_caller_metadata_to_every_turn() {
    let (gateway, sink) = gateway(Arc::new(EchoProvider::default()));
    let metadata = CallerMetadata::new()
        .organization_id("acme")
        .subscriber_email("dev@acme.test")
        .response_quality_score(0.42);

    gateway
        .chat("gemini-2.0-flash-001", &["one", "two"], Some(&metadata))
        .await
        .unwrap();
    gateway.drain().await;

    for record in sink.records() {
        assert_eq!(record.attribution.organization_id, "acme");
        assert_eq!(record.subscriber.email, "dev@acme.test");
        assert_eq!(record.response_quality_score, Some(0.42));
    }
}

#[tokio::test]
async fn test_chat_numbers_caller_transaction_id_per_turn() {
    let (gateway, sink) = gateway(Arc::new(EchoProvider::default()));
    let metadata = CallerMetadata::new().transaction_id("txn-caller");

    gateway
        .chat("gemini-2.0-flash-001", &["a", "b", "c"], Some(&metadata))
        .await
        .unwrap();
    gateway.drain().await;

    let mut ids: Vec<_> = sink
        .records()
        .iter()
        .map(|r| r.transaction_id.clone())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["txn-caller-1", "txn-caller-2", "txn-caller-3"]);
}

#[tokio::test]
async fn test_single_turn_chat_keeps_caller_transaction_id() {
    let (gateway, sink) = gateway(Arc::new(EchoProvider::default()));
    let metadata = CallerMetadata::new().transaction_id("txn-caller");

    gateway
        .chat("gemini-2.0-flash-001", &["only"], Some(&metadata))
        .await
        .unwrap();
    gateway.drain().await;

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].transaction_id, "txn-caller");
}

#[tokio::test]
async fn test_invalid_input_fails_before_provider_call() {
    let provider = Arc::new(EchoProvider::default());
    let (gateway, sink) = gateway(Arc::clone(&provider));

    let empty_model = gateway.chat("  ", &["hi"], None).await;
    assert!(matches!(empty_model, Err(MeterError::InvalidInput(_))));

    let no_prompts = gateway.chat("gemini-2.0-flash-001", &[], None).await;
    assert!(matches!(no_prompts, Err(MeterError::InvalidInput(_))));

    let embed = gateway.embed("", "text", None).await;
    assert!(matches!(embed, Err(MeterError::InvalidInput(_))));

    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    gateway.drain().await;
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_provider_error_propagates_without_record() {
    let provider = Arc::new(EchoProvider {
        fail: true,
        ..EchoProvider::default()
    });
    let (gateway, sink) = gateway(provider);

    let result = gateway.chat("gemini-2.0-flash-001", &["hi"], None).await;
    assert!(matches!(result, Err(MeterError::Api { status: 500, .. })));
    gateway.drain().await;
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_sink_failure_does_not_affect_result() {
    let gateway = Meter::builder()
        .provider(EchoProvider::default())
        .sink(ExplodingSink)
        .build()
        .unwrap();

    let transcript = gateway
        .chat("gemini-2.0-flash-001", &["hi", "again"], None)
        .await
        .unwrap();
    assert_eq!(transcript.responses.len(), 2);

    gateway.drain().await;
    assert_eq!(gateway.dispatcher().in_flight(), 0);
}

// ============================================================================
// Embed
// ============================================================================

#[tokio::test]
async fn test_embed_estimates_tokens_from_words() {
    let (gateway, sink) = gateway(Arc::new(EchoProvider::default()));

    let outcome = gateway
        .embed("text-embedding-004", "metering is fun", None)
        .await
        .unwrap();
    gateway.drain().await;

    assert_eq!(outcome.dimensions(), "metering is fun".len());
    assert_eq!(outcome.prompt_token_count, 3);
    assert_eq!(outcome.total_token_count, 3);
    assert_eq!(outcome.model_version, "text-embedding-004");

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].operation_type, OperationKind::Embed);
    assert_eq!(records[0].tokens.input, 3);
    assert_eq!(records[0].tokens.output, 0);
    assert_eq!(records[0].stop_reason, StopReason::End);
    assert_eq!(records[0].attribution.task_type, "embed");
}

// ============================================================================
// Builder
// ============================================================================

#[test]
fn test_builder_requires_provider() {
    let result = Meter::builder().sink(MemorySink::new()).build();
    assert!(matches!(result, Err(MeterError::Configuration(_))));
}

#[test]
fn test_builder_requires_sink_or_metering_key() {
    let result = Meter::builder().provider(EchoProvider::default()).build();
    assert!(matches!(result, Err(MeterError::Configuration(_))));

    let with_key = Meter::builder()
        .provider(EchoProvider::default())
        .metering_api_key("hak_test")
        .build();
    assert!(with_key.is_ok());
}

#[tokio::test]
async fn test_builder_flavor_sets_record_defaults() {
    let sink = MemorySink::new();
    let gateway = Meter::builder()
        .provider(EchoProvider::default())
        .flavor(ProviderFlavor::Vertex)
        .sink(sink.clone())
        .build()
        .unwrap();
    gateway.embed("text-embedding-004", "hi", None).await.unwrap();
    gateway.drain().await;

    let record = &sink.records()[0];
    assert_eq!(record.attribution.agent, "Vertex");
    assert_eq!(record.attribution.model_source.as_deref(), Some("GOOGLE_VERTEX_AI"));
}
