//! Telemetry record assembly.
//!
//! # Precedence
//!
//! Each field resolves on its own, highest first:
//!
//! 1. the caller's [`CallerMetadata`] value
//! 2. the value derived from the provider response ([`ProviderSignals`])
//! 3. the flavor default (see [`ProviderFlavor`])
//!
//! Durations and time-to-first-token are always derived and cannot be
//! overridden. Building never fails; anything missing degrades to its
//! default.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use super::clock::millis_between;
use crate::signals::ProviderSignals;
use crate::signals::confidence::clamp_unit;
use crate::types::{
    Attribution, CallerMetadata, Credential, Diagnostics, OperationKind, ProviderFlavor,
    Subscriber, TelemetryRecord,
};
use crate::version::MIDDLEWARE_SOURCE;

/// Default product attribution.
pub const DEFAULT_PRODUCT_ID: &str = "free-trial";
/// Default credential name, also used when the caller gives a credential
/// value without a name.
pub const DEFAULT_CREDENTIAL_NAME: &str = "apiKey";
/// Default credential value.
pub const DEFAULT_CREDENTIAL_VALUE: &str = "keyValue";
/// `costType` for every record.
pub const COST_TYPE: &str = "AI";

/// Timing and identity of one finished operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub kind: OperationKind,
    pub model: String,
    pub transaction_id: String,
    pub request_time: DateTime<Utc>,
    pub response_time: DateTime<Utc>,
    /// First streamed chunk; ignored for non-streamed operations.
    pub first_chunk_time: Option<DateTime<Utc>>,
}

/// Builds [`TelemetryRecord`]s with the defaults of one provider flavor.
#[derive(Debug, Clone, Copy, Default)]
pub struct TelemetryRecordBuilder {
    flavor: ProviderFlavor,
}

impl TelemetryRecordBuilder {
    pub fn new(flavor: ProviderFlavor) -> Self {
        Self { flavor }
    }

    pub fn flavor(&self) -> ProviderFlavor {
        self.flavor
    }

    /// Assemble a record. Pure: no I/O, never fails.
    pub fn build(
        &self,
        operation: &Operation,
        signals: ProviderSignals,
        metadata: Option<&CallerMetadata>,
    ) -> TelemetryRecord {
        let fallback = CallerMetadata::default();
        let meta = metadata.unwrap_or(&fallback);
        let streamed = operation.kind.is_streamed();

        let request_duration = millis_between(operation.request_time, operation.response_time);
        let (completion_start_time, time_to_first_token) = match operation.first_chunk_time {
            Some(first) if streamed => (first, millis_between(operation.request_time, first)),
            _ => (operation.response_time, 0),
        };

        TelemetryRecord {
            transaction_id: meta
                .transaction_id
                .clone()
                .unwrap_or_else(|| operation.transaction_id.clone()),
            operation_type: operation.kind,
            model: operation.model.clone(),
            stop_reason: signals.stop_reason,
            cost_type: COST_TYPE.to_string(),
            is_streamed: streamed,
            request_time: operation.request_time,
            response_time: operation.response_time,
            completion_start_time,
            request_duration,
            time_to_first_token,
            tokens: signals.tokens,
            response_quality_score: caller_quality_score(meta).or(signals.quality_score),
            subscriber: self.subscriber(meta),
            attribution: self.attribution(operation.kind, meta),
            diagnostics: Diagnostics {
                system_fingerprint: meta.system_fingerprint.clone(),
                temperature: caller_temperature(meta),
                error_reason: meta.error_reason.clone().or(signals.error_reason),
                mediation_latency: meta.mediation_latency,
            },
            middleware_source: MIDDLEWARE_SOURCE.to_string(),
        }
    }

    fn subscriber(&self, meta: &CallerMetadata) -> Subscriber {
        // name and value travel together: no value, no override
        let credential = match &meta.subscriber_credential {
            Some(value) => Credential {
                name: meta
                    .subscriber_credential_name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CREDENTIAL_NAME.to_string()),
                value: value.clone(),
            },
            None => Credential {
                name: DEFAULT_CREDENTIAL_NAME.to_string(),
                value: DEFAULT_CREDENTIAL_VALUE.to_string(),
            },
        };

        Subscriber {
            id: meta
                .subscriber_id
                .clone()
                .unwrap_or_else(|| format!("user-{}", Uuid::new_v4())),
            email: meta
                .subscriber_email
                .clone()
                .unwrap_or_else(|| self.flavor.placeholder_email()),
            credential,
        }
    }

    fn attribution(&self, kind: OperationKind, meta: &CallerMetadata) -> Attribution {
        Attribution {
            organization_id: meta
                .organization_id
                .clone()
                .unwrap_or_else(|| format!("my-customer-name-{}", Uuid::new_v4())),
            product_id: meta
                .product_id
                .clone()
                .unwrap_or_else(|| DEFAULT_PRODUCT_ID.to_string()),
            agent: meta
                .agent
                .clone()
                .unwrap_or_else(|| self.flavor.agent().to_string()),
            subscription_id: meta.subscription_id.clone(),
            trace_id: meta.trace_id.clone(),
            task_type: meta
                .task_type
                .clone()
                .unwrap_or_else(|| kind.task_type().to_string()),
            model_source: Some(
                meta.model_source
                    .clone()
                    .unwrap_or_else(|| self.flavor.model_source().to_string()),
            ),
            provider: meta
                .provider
                .clone()
                .unwrap_or_else(|| self.flavor.provider().to_string()),
        }
    }
}

fn caller_quality_score(meta: &CallerMetadata) -> Option<f64> {
    let score = meta.response_quality_score?;
    let clamped = clamp_unit(score);
    if clamped != Some(score) {
        warn!(score, "caller quality score outside [0, 1], clamping");
    }
    clamped
}

fn caller_temperature(meta: &CallerMetadata) -> Option<f64> {
    let temperature = meta.temperature?;
    if temperature.is_finite() && temperature >= 0.0 {
        Some(temperature)
    } else {
        warn!(temperature, "dropping invalid caller temperature");
        None
    }
}
