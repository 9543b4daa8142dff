//! Builder for configuring metered gateways

use std::sync::Arc;

use super::MeteredGateway;
use crate::config::{MeterConfig, MeteringConfig};
use crate::metering::{Dispatcher, MeteringClient, MeteringSink};
use crate::providers::GenerativeProvider;
use crate::types::ProviderFlavor;
use crate::{MeterError, Result};

#[cfg(feature = "google")]
use crate::providers::GoogleClient;

/// Main entry point for creating metered gateways.
pub struct Meter;

impl Meter {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> MeterBuilder {
        MeterBuilder::new()
    }
}

/// Builder for configuring metered gateways.
///
/// A gateway needs a provider and somewhere to send records: either an
/// explicit [`MeteringSink`] or a metering API key.
#[derive(Default)]
pub struct MeterBuilder {
    provider: Option<Arc<dyn GenerativeProvider>>,
    flavor: Option<ProviderFlavor>,
    sink: Option<Arc<dyn MeteringSink>>,
    metering: MeteringConfig,
}

impl MeterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom provider.
    pub fn provider(self, provider: impl GenerativeProvider + 'static) -> Self {
        self.provider_arc(Arc::new(provider))
    }

    /// Use a shared provider.
    pub fn provider_arc(mut self, provider: Arc<dyn GenerativeProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Configure the Google AI Studio (Gemini API) provider.
    #[cfg(feature = "google")]
    pub fn google(self, api_key: impl Into<String>) -> Self {
        self.google_client(GoogleClient::google(api_key))
    }

    /// Configure the Vertex AI provider with a pre-minted access token.
    #[cfg(feature = "google")]
    pub fn vertex(self, project: &str, location: &str, access_token: impl Into<String>) -> Self {
        self.google_client(GoogleClient::vertex(project, location, access_token))
    }

    /// Use a configured Google client; the flavor follows the client.
    #[cfg(feature = "google")]
    pub fn google_client(mut self, client: GoogleClient) -> Self {
        self.flavor.get_or_insert(client.flavor());
        self.provider(client)
    }

    /// Set the flavor whose defaults fill unset record fields
    /// (default: [`ProviderFlavor::Google`]).
    pub fn flavor(mut self, flavor: ProviderFlavor) -> Self {
        self.flavor = Some(flavor);
        self
    }

    /// Send records to the metering API with this key.
    pub fn metering_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.metering.api_key = Some(api_key.into());
        self
    }

    /// Override the metering API base URL.
    pub fn metering_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.metering.base_url = base_url.into();
        self
    }

    /// Send records to a custom sink instead of the metering API.
    pub fn sink(self, sink: impl MeteringSink + 'static) -> Self {
        self.sink_arc(Arc::new(sink))
    }

    /// Send records to a shared sink.
    pub fn sink_arc(mut self, sink: Arc<dyn MeteringSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Apply metering settings and (with the `google` feature) the provider
    /// described by `config`.
    pub fn config(mut self, config: &MeterConfig) -> Result<Self> {
        self.metering = config.metering.clone();
        self.flavor = Some(config.provider.flavor);
        #[cfg(feature = "google")]
        if self.provider.is_none() {
            self = self.google_client(GoogleClient::from_config(&config.provider)?);
        }
        Ok(self)
    }

    /// Build the gateway.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if no provider is set, or if neither a sink
    /// nor a metering API key is set.
    pub fn build(self) -> Result<MeteredGateway> {
        let provider = self
            .provider
            .ok_or_else(|| MeterError::Configuration("no provider configured".into()))?;

        let sink = match self.sink {
            Some(sink) => sink,
            None => Arc::new(MeteringClient::from_config(&self.metering)?),
        };

        Ok(MeteredGateway::new(
            provider,
            self.flavor.unwrap_or_default(),
            Dispatcher::new(sink),
        ))
    }
}
