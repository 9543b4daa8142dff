//! MeteredGateway - provider calls with one telemetry record per operation

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::metering::{Dispatcher, ObservedStream, StreamSummary};
use crate::providers::{ChunkStream, GenerativeProvider};
use crate::record::{Operation, OperationClock, TelemetryRecordBuilder};
use crate::signals::ProviderSignals;
use crate::types::{
    CallerMetadata, ChatTranscript, ChatTurn, Content, EmbeddingOutcome, GenerateResponse,
    OperationKind, ProviderFlavor, TelemetryRecord,
};
use crate::{MeterError, Result, telemetry};

/// Stream returned by [`MeteredGateway::stream`]. Reports its record once
/// the consumer reads it to the end or drops it.
pub type MeteredStream = ObservedStream<ChunkStream, GenerateResponse>;

/// Gateway that meters every provider call.
///
/// Provider failures propagate unchanged. Telemetry never fails an
/// operation: records are delivered on detached tasks owned by the
/// gateway's [`Dispatcher`].
#[derive(Clone)]
pub struct MeteredGateway {
    provider: Arc<dyn GenerativeProvider>,
    records: TelemetryRecordBuilder,
    dispatcher: Dispatcher,
}

impl MeteredGateway {
    pub(crate) fn new(
        provider: Arc<dyn GenerativeProvider>,
        flavor: ProviderFlavor,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            provider,
            records: TelemetryRecordBuilder::new(flavor),
            dispatcher,
        }
    }

    pub fn flavor(&self) -> ProviderFlavor {
        self.records.flavor()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Multi-turn chat: each prompt is sent in order with the conversation
    /// so far, and each turn produces its own record.
    ///
    /// `histories` alternates user prompt and model reply. A caller
    /// transaction id is suffixed with the 1-based turn number when there
    /// is more than one prompt, so every turn keeps its own id.
    #[instrument(
        name = "meter.chat",
        skip(self, prompts, metadata),
        fields(provider = self.provider.name(), turns = prompts.len())
    )]
    pub async fn chat(
        &self,
        model: &str,
        prompts: &[&str],
        metadata: Option<&CallerMetadata>,
    ) -> Result<ChatTranscript> {
        validate_model(model)?;
        if prompts.is_empty() {
            return Err(MeterError::InvalidInput(
                "at least one prompt is required".into(),
            ));
        }

        let mut contents = Vec::with_capacity(prompts.len() * 2);
        let mut transcript = ChatTranscript::default();

        for (turn_index, prompt) in prompts.iter().enumerate() {
            let clock = OperationClock::start();
            let transaction_id = Uuid::new_v4().to_string();

            contents.push(Content::user(*prompt));
            let response = self.provider.generate(model, &contents).await?;
            let response_time = clock.now();

            let turn = ChatTurn::from_response(&response);
            contents.push(Content::model(turn.text.clone()));
            transcript.histories.push(prompt.to_string());
            transcript.histories.push(turn.text.clone());

            let operation = Operation {
                kind: OperationKind::Chat,
                model: model.to_string(),
                transaction_id,
                request_time: clock.started_at(),
                response_time,
                first_chunk_time: None,
            };
            let turn_meta = turn_metadata(metadata, turn_index, prompts.len());
            self.emit(
                &operation,
                ProviderSignals::from_response(&response),
                turn_meta.as_deref(),
            );
            transcript.responses.push(turn);
        }

        Ok(transcript)
    }

    /// Streaming generation over `prompts` joined by newlines.
    ///
    /// The record is synthesised from the last chunk once the returned
    /// stream ends; read it to the end to have the record sent before the
    /// terminal `None`.
    #[instrument(
        name = "meter.stream",
        skip(self, prompts, metadata),
        fields(provider = self.provider.name())
    )]
    pub async fn stream(
        &self,
        model: &str,
        prompts: &[&str],
        metadata: Option<&CallerMetadata>,
    ) -> Result<MeteredStream> {
        validate_model(model)?;
        if prompts.is_empty() {
            return Err(MeterError::InvalidInput(
                "at least one prompt is required".into(),
            ));
        }

        let clock = OperationClock::start();
        let transaction_id = Uuid::new_v4().to_string();
        let contents = [Content::user(prompts.join("\n"))];
        let chunks = self.provider.generate_stream(model, &contents).await?;

        let gateway = self.clone();
        let model = model.to_string();
        let metadata = metadata.cloned();
        let finalize = move |summary: StreamSummary<GenerateResponse>| async move {
            info!(
                chunks = summary.chunks,
                end = ?summary.end,
                "stream finished"
            );
            let signals = ProviderSignals::from_stream(
                summary.last_chunk.as_ref(),
                summary.end,
                summary.error,
            );
            let operation = Operation {
                kind: OperationKind::Stream,
                model,
                transaction_id,
                request_time: clock.started_at(),
                response_time: summary.ended_at,
                first_chunk_time: summary.first_chunk_at,
            };
            let record = gateway.build(&operation, signals, metadata.as_ref());
            gateway.dispatcher.sink().send(&record).await;
        };

        Ok(ObservedStream::new(
            chunks,
            clock,
            self.dispatcher.clone(),
            finalize,
        ))
    }

    /// Embed `text`. Without provider usage, token counts are estimated
    /// from the word count of `text`.
    #[instrument(
        name = "meter.embed",
        skip(self, text, metadata),
        fields(provider = self.provider.name())
    )]
    pub async fn embed(
        &self,
        model: &str,
        text: &str,
        metadata: Option<&CallerMetadata>,
    ) -> Result<EmbeddingOutcome> {
        validate_model(model)?;

        let clock = OperationClock::start();
        let transaction_id = Uuid::new_v4().to_string();
        let response = self.provider.embed(model, text).await?;
        let response_time = clock.now();

        let signals = ProviderSignals::from_embedding(&response, text);
        let (input, total) = (signals.tokens.input, signals.tokens.total);
        let operation = Operation {
            kind: OperationKind::Embed,
            model: model.to_string(),
            transaction_id,
            request_time: clock.started_at(),
            response_time,
            first_chunk_time: None,
        };
        self.emit(&operation, signals, metadata);

        Ok(EmbeddingOutcome::new(response, model, input, total))
    }

    /// Wait for every detached telemetry task to finish.
    pub async fn drain(&self) {
        self.dispatcher.drain().await;
    }

    /// [`drain`](Self::drain) with an upper bound; `false` on timeout.
    pub async fn drain_timeout(&self, timeout: Duration) -> bool {
        self.dispatcher.drain_timeout(timeout).await
    }

    fn build(
        &self,
        operation: &Operation,
        signals: ProviderSignals,
        metadata: Option<&CallerMetadata>,
    ) -> TelemetryRecord {
        let record = self.records.build(operation, signals, metadata);
        metrics::counter!(
            telemetry::RECORDS_TOTAL,
            "operation" => operation.kind.task_type()
        )
        .increment(1);
        debug!(
            transaction_id = %record.transaction_id,
            operation = operation.kind.as_str(),
            stop_reason = %record.stop_reason,
            has_metadata = metadata.is_some(),
            "telemetry record built"
        );
        record
    }

    fn emit(
        &self,
        operation: &Operation,
        signals: ProviderSignals,
        metadata: Option<&CallerMetadata>,
    ) {
        let record = self.build(operation, signals, metadata);
        self.dispatcher.dispatch(record);
    }
}

impl std::fmt::Debug for MeteredGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeteredGateway")
            .field("provider", &self.provider.name())
            .field("flavor", &self.flavor())
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

/// Metadata for chat turn `turn` of `turns`.
fn turn_metadata(
    metadata: Option<&CallerMetadata>,
    turn: usize,
    turns: usize,
) -> Option<Cow<'_, CallerMetadata>> {
    let meta = metadata?;
    match &meta.transaction_id {
        Some(id) if turns > 1 => {
            let mut numbered = meta.clone();
            numbered.transaction_id = Some(format!("{id}-{}", turn + 1));
            Some(Cow::Owned(numbered))
        }
        _ => Some(Cow::Borrowed(meta)),
    }
}

fn validate_model(model: &str) -> Result<()> {
    if model.trim().is_empty() {
        return Err(MeterError::InvalidInput("model name is required".into()));
    }
    Ok(())
}
