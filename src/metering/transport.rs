//! HTTP delivery to the metering API.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::{debug, error, info, warn};

use super::sink::MeteringSink;
use crate::config::MeteringConfig;
use crate::types::TelemetryRecord;
use crate::{MeterError, Result, telemetry};

/// Default metering API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.revenium.ai";

const COMPLETIONS_PATH: &str = "/meter/v2/ai/completions";

/// Delivers records to `{base}/meter/v2/ai/completions`.
///
/// Each record is POSTed once. Rejections and transport errors are logged
/// and counted, never retried and never returned.
#[derive(Clone)]
pub struct MeteringClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl MeteringClient {
    /// Client for the default metering API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Client for a custom base URL (self-hosted endpoint, or wiremock).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            http: Client::new(),
        }
    }

    /// Client from resolved configuration. Fails if no API key is set.
    pub fn from_config(config: &MeteringConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| MeterError::Configuration("metering API key is not set".into()))?;
        Ok(Self::with_base_url(api_key, config.base_url.clone()))
    }

    /// Full completions endpoint. A base that already ends in `/meter` or
    /// `/meter/v2` is not suffixed twice.
    pub fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/meter/v2") {
            format!("{base}/ai/completions")
        } else if base.ends_with("/meter") {
            format!("{base}/v2/ai/completions")
        } else {
            format!("{base}{COMPLETIONS_PATH}")
        }
    }
}

impl std::fmt::Debug for MeteringClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeteringClient")
            .field("api_key", &crate::types::REDACTED)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl MeteringSink for MeteringClient {
    async fn send(&self, record: &TelemetryRecord) {
        let url = self.endpoint();
        match serde_json::to_string(&record.redacted()) {
            Ok(payload) => debug!(url = %url, payload = %payload, "sending metering record"),
            Err(e) => debug!(url = %url, error = %e, "metering record not loggable"),
        }

        let started = Instant::now();
        let result = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(record)
            .send()
            .await;

        let status = match result {
            Ok(response) if response.status().is_success() => {
                info!(
                    transaction_id = %record.transaction_id,
                    status = response.status().as_u16(),
                    "metering record delivered"
                );
                "ok"
            }
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                let reason = match status {
                    400 => "metering API rejected the payload (validation failed)",
                    401 => "metering API rejected the credentials (check the API key)",
                    _ => "metering API returned an error",
                };
                warn!(
                    transaction_id = %record.transaction_id,
                    status,
                    body = %body,
                    "{reason}"
                );
                "rejected"
            }
            Err(e) => {
                error!(
                    transaction_id = %record.transaction_id,
                    url = %url,
                    error = %e,
                    "metering record delivery failed"
                );
                "failed"
            }
        };

        metrics::counter!(telemetry::DELIVERIES_TOTAL, "status" => status).increment(1);
        metrics::histogram!(telemetry::DELIVERY_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
    }
}
