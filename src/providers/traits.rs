//! Provider trait for generative AI backends.
//!
//! The metered gateway talks to a backend only through
//! [`GenerativeProvider`]. The bundled [`GoogleClient`](super::GoogleClient)
//! implements it for Google AI and Vertex AI; tests and embedders can supply
//! their own.
//!
//! Errors returned here propagate to the caller unchanged. Telemetry for a
//! failed call is never produced by the provider itself.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::Result;
use crate::types::{Content, EmbedResponse, GenerateResponse};

/// Stream of response chunks from a streaming generation call.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<GenerateResponse>> + Send>>;

/// A generative AI backend.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Provider name for logging/debugging.
    fn name(&self) -> &str;

    /// Generate a complete response for `contents`.
    async fn generate(&self, model: &str, contents: &[Content]) -> Result<GenerateResponse>;

    /// Generate a response as a stream of chunks. Usage and finish reason
    /// are expected on the last chunk.
    async fn generate_stream(&self, model: &str, contents: &[Content]) -> Result<ChunkStream>;

    /// Embed a single text.
    async fn embed(&self, model: &str, text: &str) -> Result<EmbedResponse>;
}
