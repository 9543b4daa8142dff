//! REST client for Google AI Studio (Gemini API) and Vertex AI.
//!
//! | Operation | Google AI | Vertex AI |
//! |---|---|---|
//! | generate | `models/{m}:generateContent` | same, under the project path |
//! | stream | `models/{m}:streamGenerateContent?alt=sse` | same |
//! | embed | `models/{m}:embedContent` | `models/{m}:predict` |
//!
//! Google AI authenticates with an API key (`x-goog-api-key`). Vertex AI
//! takes a bearer token the caller has already minted; this client never
//! exchanges service-account credentials.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::traits::{ChunkStream, GenerativeProvider};
use crate::config::ProviderConfig;
use crate::types::{Content, EmbedResponse, GenerateResponse, ProviderFlavor, UsageMetadata};
use crate::{MeterError, Result};

/// Default base URL for the Gemini API.
pub const GOOGLE_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone)]
enum Auth {
    ApiKey(String),
    Bearer(String),
}

/// Client for Google's generative AI REST APIs.
#[derive(Clone)]
pub struct GoogleClient {
    flavor: ProviderFlavor,
    auth: Auth,
    base_url: String,
    http: Client,
}

impl GoogleClient {
    /// Google AI Studio client authenticated with an API key.
    pub fn google(api_key: impl Into<String>) -> Self {
        Self {
            flavor: ProviderFlavor::Google,
            auth: Auth::ApiKey(api_key.into()),
            base_url: GOOGLE_AI_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    /// Vertex AI client for `project` in `location`, authenticated with a
    /// pre-minted OAuth access token.
    pub fn vertex(project: &str, location: &str, access_token: impl Into<String>) -> Self {
        Self {
            flavor: ProviderFlavor::Vertex,
            auth: Auth::Bearer(access_token.into()),
            base_url: format!(
                "https://{location}-aiplatform.googleapis.com/v1/projects/{project}/locations/{location}/publishers/google"
            ),
            http: Client::new(),
        }
    }

    /// Replace the base URL (for testing with wiremock). Model paths are
    /// appended as `{base}/models/{model}:{method}`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Client for the flavor and credentials in `config`.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let client = match config.flavor {
            ProviderFlavor::Google => {
                let api_key = non_empty(config.api_key.as_deref()).ok_or_else(|| {
                    MeterError::Configuration("Google API key is not set".into())
                })?;
                Self::google(api_key)
            }
            ProviderFlavor::Vertex => {
                let project = non_empty(config.project.as_deref()).ok_or_else(|| {
                    MeterError::Configuration("Vertex AI project is not set".into())
                })?;
                let token = non_empty(config.access_token.as_deref()).ok_or_else(|| {
                    MeterError::Configuration("Vertex AI access token is not set".into())
                })?;
                Self::vertex(project, &config.location, token)
            }
        };
        Ok(match config.base_url.as_deref() {
            Some(base) => client.with_base_url(base),
            None => client,
        })
    }

    pub fn flavor(&self) -> ProviderFlavor {
        self.flavor
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{model}:{method}", self.base_url)
    }

    async fn post<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Response> {
        let request = self.http.post(url).json(body);
        let request = match &self.auth {
            Auth::ApiKey(key) => request.header("x-goog-api-key", key),
            Auth::Bearer(token) => request.bearer_auth(token),
        };
        let response = request.send().await?;
        check_status(response).await
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(MeterError::from_status(status.as_u16(), body))
}

impl std::fmt::Debug for GoogleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleClient")
            .field("flavor", &self.flavor)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl GenerativeProvider for GoogleClient {
    fn name(&self) -> &str {
        match self.flavor {
            ProviderFlavor::Google => "google",
            ProviderFlavor::Vertex => "vertex",
        }
    }

    #[instrument(name = "google.generate", skip(self, contents), fields(flavor = %self.flavor))]
    async fn generate(&self, model: &str, contents: &[Content]) -> Result<GenerateResponse> {
        let url = self.model_url(model, "generateContent");
        let response = self.post(&url, &GenerateRequest { contents }).await?;
        Ok(response.json().await?)
    }

    #[instrument(
        name = "google.generate_stream",
        skip(self, contents),
        fields(flavor = %self.flavor)
    )]
    async fn generate_stream(&self, model: &str, contents: &[Content]) -> Result<ChunkStream> {
        let url = format!("{}?alt=sse", self.model_url(model, "streamGenerateContent"));
        let response = self.post(&url, &GenerateRequest { contents }).await?;

        let chunks = response
            .bytes_stream()
            .eventsource()
            .filter_map(|event| async move {
                match event {
                    Ok(event) if event.data.trim().is_empty() => None,
                    Ok(event) => Some(
                        serde_json::from_str::<GenerateResponse>(&event.data)
                            .map_err(MeterError::from),
                    ),
                    Err(e) => Some(Err(MeterError::Stream(e.to_string()))),
                }
            });
        Ok(Box::pin(chunks))
    }

    #[instrument(name = "google.embed", skip(self, text), fields(flavor = %self.flavor))]
    async fn embed(&self, model: &str, text: &str) -> Result<EmbedResponse> {
        match self.flavor {
            ProviderFlavor::Google => {
                let url = self.model_url(model, "embedContent");
                let body = EmbedContentRequest {
                    content: Content {
                        role: None,
                        parts: vec![crate::types::Part {
                            text: Some(text.to_string()),
                        }],
                    },
                };
                let response: EmbedContentResponse = self.post(&url, &body).await?.json().await?;
                Ok(EmbedResponse {
                    values: response.embedding.values,
                    model_version: None,
                    usage_metadata: None,
                })
            }
            ProviderFlavor::Vertex => {
                let url = self.model_url(model, "predict");
                let body = PredictRequest {
                    instances: vec![PredictInstance { content: text }],
                };
                let response: PredictResponse = self.post(&url, &body).await?.json().await?;
                let prediction = response
                    .predictions
                    .into_iter()
                    .next()
                    .ok_or(MeterError::EmptyResponse)?;
                let usage = prediction
                    .embeddings
                    .statistics
                    .and_then(|stats| stats.token_count)
                    .map(|count| UsageMetadata {
                        prompt_token_count: Some(count),
                        total_token_count: Some(count),
                        ..UsageMetadata::default()
                    });
                debug!(dimensions = prediction.embeddings.values.len(), "vertex embedding");
                Ok(EmbedResponse {
                    values: prediction.embeddings.values,
                    model_version: response.deployed_model_id,
                    usage_metadata: usage,
                })
            }
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: &'a [Content],
}

#[derive(Serialize)]
struct EmbedContentRequest {
    content: Content,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    instances: Vec<PredictInstance<'a>>,
}

#[derive(Serialize)]
struct PredictInstance<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
    #[serde(default)]
    deployed_model_id: Option<String>,
}

#[derive(Deserialize)]
struct Prediction {
    embeddings: PredictionEmbeddings,
}

#[derive(Deserialize)]
struct PredictionEmbeddings {
    #[serde(default)]
    values: Vec<f32>,
    #[serde(default)]
    statistics: Option<EmbeddingStatistics>,
}

#[derive(Deserialize)]
struct EmbeddingStatistics {
    #[serde(default)]
    token_count: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_url_strips_models_prefix() {
        let client = GoogleClient::google("key").with_base_url("http://localhost:1/v1beta/");
        assert_eq!(
            client.model_url("models/gemini-2.0-flash", "generateContent"),
            "http://localhost:1/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn vertex_url_is_project_scoped() {
        let client = GoogleClient::vertex("my-proj", "europe-west4", "token");
        assert_eq!(
            client.model_url("text-embedding-004", "predict"),
            "https://europe-west4-aiplatform.googleapis.com/v1/projects/my-proj/locations/europe-west4/publishers/google/models/text-embedding-004:predict"
        );
    }

    #[test]
    fn from_config_requires_credentials() {
        let config = ProviderConfig {
            flavor: ProviderFlavor::Vertex,
            project: Some("p".into()),
            ..ProviderConfig::default()
        };
        assert!(matches!(
            GoogleClient::from_config(&config),
            Err(MeterError::Configuration(_))
        ));
    }
}
