//! Caller-supplied metadata that overrides derived record fields.

use serde::{Deserialize, Serialize};

/// Optional per-call overrides for a telemetry record.
///
/// Every field resolves independently: a set field replaces the derived or
/// default value for that field only. `response_quality_score` replaces the
/// score extracted from the provider response.
///
/// ```rust
/// # use genai_meter::CallerMetadata;
/// let metadata = CallerMetadata::default()
///     .organization_id("acme-corp")
///     .subscriber_email("dev@acme.example")
///     .trace_id("checkout-flow-42");
/// assert_eq!(metadata.organization_id.as_deref(), Some("acme-corp"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerMetadata {
    /// Correlation id for the operation; generated when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Groups related calls in one workflow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriber_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriber_id: Option<String>,
    /// Name for `subscriber_credential`; only used when a value is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriber_credential_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriber_credential: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// 0.0 (lowest) to 1.0 (highest).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_quality_score: Option<f64>,
    /// Routing layer used to reach the model (e.g. "DIRECT", "LITELLM").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    /// Gateway latency in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mediation_latency: Option<u64>,
}

impl CallerMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transaction_id(mut self, id: impl Into<String>) -> Self {
        self.transaction_id = Some(id.into());
        self
    }

    pub fn trace_id(mut self, id: impl Into<String>) -> Self {
        self.trace_id = Some(id.into());
        self
    }

    pub fn task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = Some(task_type.into());
        self
    }

    pub fn subscriber_email(mut self, email: impl Into<String>) -> Self {
        self.subscriber_email = Some(email.into());
        self
    }

    pub fn subscriber_id(mut self, id: impl Into<String>) -> Self {
        self.subscriber_id = Some(id.into());
        self
    }

    /// Set the subscriber credential (name and value travel together).
    pub fn subscriber_credential(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.subscriber_credential_name = Some(name.into());
        self.subscriber_credential = Some(value.into());
        self
    }

    pub fn organization_id(mut self, id: impl Into<String>) -> Self {
        self.organization_id = Some(id.into());
        self
    }

    pub fn subscription_id(mut self, id: impl Into<String>) -> Self {
        self.subscription_id = Some(id.into());
        self
    }

    pub fn product_id(mut self, id: impl Into<String>) -> Self {
        self.product_id = Some(id.into());
        self
    }

    pub fn agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn response_quality_score(mut self, score: f64) -> Self {
        self.response_quality_score = Some(score);
        self
    }

    pub fn model_source(mut self, source: impl Into<String>) -> Self {
        self.model_source = Some(source.into());
        self
    }

    pub fn system_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.system_fingerprint = Some(fingerprint.into());
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn error_reason(mut self, reason: impl Into<String>) -> Self {
        self.error_reason = Some(reason.into());
        self
    }

    pub fn mediation_latency(mut self, millis: u64) -> Self {
        self.mediation_latency = Some(millis);
        self
    }
}
