//! genai-meter - usage metering for Google generative AI calls
//!
//! Every chat turn, stream, and embedding call made through a
//! [`MeteredGateway`] produces exactly one [`TelemetryRecord`]: timing,
//! token counts, stop reason, and quality score derived from the provider
//! response, merged with optional caller [`CallerMetadata`], and delivered
//! to the metering API on a detached task. Delivery problems are logged,
//! never returned.
//!
//! # Chat Example
//!
//! ```rust,no_run
//! use genai_meter::{CallerMetadata, Meter};
//!
//! #[tokio::main]
//! async fn main() -> genai_meter::Result<()> {
//!     let gateway = Meter::builder()
//!         .google("your-google-api-key")
//!         .metering_api_key("hak_your_metering_key")
//!         .build()?;
//!
//!     let metadata = CallerMetadata::new()
//!         .organization_id("acme")
//!         .subscriber_email("dev@acme.test");
//!
//!     let transcript = gateway
//!         .chat("gemini-2.0-flash-001", &["What is the capital of France?"], Some(&metadata))
//!         .await?;
//!     println!("{}", transcript.responses[0].text);
//!
//!     // Short-lived programs wait for pending records before exiting.
//!     gateway.drain().await;
//!     Ok(())
//! }
//! ```
//!
//! # Streaming Example
//!
//! ```rust,no_run
//! use futures_util::StreamExt;
//! use genai_meter::Meter;
//!
//! #[tokio::main]
//! async fn main() -> genai_meter::Result<()> {
//!     let gateway = Meter::builder()
//!         .vertex("my-project", "us-central1", "ya29.access-token")
//!         .metering_api_key("hak_your_metering_key")
//!         .build()?;
//!
//!     let mut stream = gateway.stream("gemini-2.0-flash-001", &["Tell me a story"], None).await?;
//!     while let Some(chunk) = stream.next().await {
//!         print!("{}", chunk?.output_text());
//!     }
//!     // The record was sent before the stream returned `None`.
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod metering;
pub mod providers;
pub mod record;
pub mod signals;
pub mod telemetry;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use config::{LogLevel, MeterConfig, verify_environment};
pub use error::{MeterError, Result};
pub use gateway::{Meter, MeterBuilder, MeteredGateway, MeteredStream};
pub use metering::{Dispatcher, MemorySink, MeteringClient, MeteringSink};
pub use providers::{ChunkStream, GenerativeProvider};
pub use record::TelemetryRecordBuilder;

#[cfg(feature = "google")]
pub use providers::GoogleClient;

// Re-export all types
pub use types::{
    CallerMetadata, ChatTranscript, ChatTurn, Content, EmbedResponse, EmbeddingOutcome,
    GenerateResponse, OperationKind, ProviderFlavor, StopReason, TelemetryRecord, TokenCounts,
    UsageMetadata,
};
