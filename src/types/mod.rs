//! Public types for the genai-meter API.

mod flavor;
mod metadata;
mod outcome;
mod record;
mod response;
mod stop_reason;

pub use flavor::ProviderFlavor;
pub use metadata::CallerMetadata;
pub use outcome::{ChatTranscript, ChatTurn, EmbeddingOutcome, UsageSummary};
pub use record::{
    Attribution, Credential, Diagnostics, OperationKind, REDACTED, Subscriber, TelemetryRecord,
    TokenCounts, format_timestamp,
};
pub use response::{
    Candidate, Content, EmbedResponse, GenerateResponse, GroundingMetadata, GroundingSupport,
    Part, RetrievalMetadata, UsageMetadata,
};
pub use stop_reason::{StopReason, UnknownStopReason};
