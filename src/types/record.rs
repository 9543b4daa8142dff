//! The outbound telemetry record.
//!
//! One [`TelemetryRecord`] describes one completed operation (a chat turn, a
//! stream, or an embedding call). It serializes to the flat camelCase JSON
//! object the metering endpoint expects; attribution and diagnostics are
//! grouped in Rust but flattened on the wire.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

use super::stop_reason::StopReason;

/// Placeholder shown in logs instead of the subscriber credential value.
pub const REDACTED: &str = "***REDACTED***";

/// Kind of operation a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Chat,
    Stream,
    Embed,
}

impl OperationKind {
    /// Wire name, e.g. `"CHAT"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Chat => "CHAT",
            OperationKind::Stream => "STREAM",
            OperationKind::Embed => "EMBED",
        }
    }

    /// Default `taskType` for this kind (lowercase wire name).
    pub fn task_type(&self) -> &'static str {
        match self {
            OperationKind::Chat => "chat",
            OperationKind::Stream => "stream",
            OperationKind::Embed => "embed",
        }
    }

    pub fn is_streamed(&self) -> bool {
        matches!(self, OperationKind::Stream)
    }
}

/// Canonical token counts. Cached and reasoning counts are omitted from the
/// wire payload when zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenCounts {
    #[serde(rename = "inputTokenCount")]
    pub input: u64,
    #[serde(rename = "outputTokenCount")]
    pub output: u64,
    #[serde(rename = "totalTokenCount")]
    pub total: u64,
    #[serde(rename = "cacheCreationTokenCount", skip_serializing_if = "is_zero")]
    pub cached: u64,
    #[serde(rename = "reasoningTokenCount", skip_serializing_if = "is_zero")]
    pub reasoning: u64,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscriber {
    pub id: String,
    pub email: String,
    pub credential: Credential,
}

/// Who the usage is billed to and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribution {
    pub organization_id: String,
    pub product_id: String,
    pub agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    pub task_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_source: Option<String>,
    pub provider: String,
}

/// Optional passthrough fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    /// Milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mediation_latency: Option<u64>,
}

/// A single usage record, built once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    pub transaction_id: String,
    pub operation_type: OperationKind,
    pub model: String,
    pub stop_reason: StopReason,
    pub cost_type: String,
    pub is_streamed: bool,
    #[serde(serialize_with = "serialize_timestamp")]
    pub request_time: DateTime<Utc>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub response_time: DateTime<Utc>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub completion_start_time: DateTime<Utc>,
    /// Milliseconds between request and response.
    pub request_duration: u64,
    /// Milliseconds from request start to first streamed chunk.
    pub time_to_first_token: u64,
    #[serde(flatten)]
    pub tokens: TokenCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_quality_score: Option<f64>,
    pub subscriber: Subscriber,
    #[serde(flatten)]
    pub attribution: Attribution,
    #[serde(flatten)]
    pub diagnostics: Diagnostics,
    pub middleware_source: String,
}

impl TelemetryRecord {
    /// Copy of this record with the subscriber credential value masked,
    /// for logging.
    pub fn redacted(&self) -> TelemetryRecord {
        let mut copy = self.clone();
        copy.subscriber.credential.value = REDACTED.to_string();
        copy
    }
}

/// Render a timestamp the way the metering API expects:
/// `2025-01-01T00:00:00.000Z`.
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_timestamp<S: Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_timestamp(t))
}
