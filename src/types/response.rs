//! Provider response shapes (Gemini / Vertex AI `generateContent`).
//!
//! Every field is optional. Leaves with the wrong JSON type (a string where a
//! number belongs, an object where a list belongs) deserialize as absent
//! instead of failing the whole response, so a malformed usage block never
//! costs the caller their generated text.

use serde::{Deserialize, Serialize};

/// A single `generateContent` response, or one chunk of a streamed one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    /// Pre-joined output text (SDK convenience field; REST responses carry
    /// text inside `candidates[0].content` instead).
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub text: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub model_version: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub response_id: Option<String>,
    /// Top-level finish reason (alternative response layout).
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub finish_reason: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::nested",
        skip_serializing_if = "Option::is_none"
    )]
    pub usage_metadata: Option<UsageMetadata>,
    #[serde(
        default,
        deserialize_with = "lenient::list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// Output text: the `text` field if present, otherwise the concatenated
    /// text parts of the first candidate.
    pub fn output_text(&self) -> String {
        if let Some(text) = &self.text {
            return text.clone();
        }
        self.first_candidate()
            .and_then(|c| c.content.as_ref())
            .map(Content::joined_text)
            .unwrap_or_default()
    }

    /// The first candidate, where every per-response signal is read from.
    pub fn first_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }
}

/// Token usage block as reported by the provider.
///
/// Counts are kept as raw floats: providers have been seen sending negative
/// and fractional values, and normalisation happens in one place
/// ([`crate::signals::tokens`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub prompt_token_count: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub candidates_token_count: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_token_count: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub cached_content_token_count: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub thoughts_token_count: Option<f64>,
}

/// One generation candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(
        default,
        deserialize_with = "lenient::nested",
        skip_serializing_if = "Option::is_none"
    )]
    pub content: Option<Content>,
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub finish_reason: Option<String>,
    /// Average log-probability of the generated tokens.
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub avg_logprobs: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::nested",
        skip_serializing_if = "Option::is_none"
    )]
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(
        default,
        deserialize_with = "lenient::list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub grounding_supports: Vec<GroundingSupport>,
    #[serde(
        default,
        deserialize_with = "lenient::nested",
        skip_serializing_if = "Option::is_none"
    )]
    pub retrieval_metadata: Option<RetrievalMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingSupport {
    /// Per-span confidence values; non-numeric entries are dropped.
    #[serde(
        default,
        deserialize_with = "lenient::numbers",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub confidence_scores: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalMetadata {
    #[serde(
        default,
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub google_search_dynamic_retrieval_score: Option<f64>,
}

/// A conversation turn, used both in requests and in candidate output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub parts: Vec<Part>,
}

impl Content {
    /// A user turn holding a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_role("user", text)
    }

    /// A model turn holding a single text part.
    pub fn model(text: impl Into<String>) -> Self {
        Self::with_role("model", text)
    }

    fn with_role(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![Part {
                text: Some(text.into()),
            }],
        }
    }

    /// Text of every part, concatenated.
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub text: Option<String>,
}

/// Embedding response, normalised across Google AI (`embedContent`) and
/// Vertex AI (`predict`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbedResponse {
    pub values: Vec<f32>,
    pub model_version: Option<String>,
    /// Present only when the provider reports token usage for embeddings
    /// (Vertex does, Google AI does not).
    pub usage_metadata: Option<UsageMetadata>,
}

/// Deserializers that read wrongly-typed leaves as absent.
mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub(super) fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(Value::deserialize(d)?.as_f64())
    }

    pub(super) fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            _ => None,
        })
    }

    pub(super) fn numbers<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items.iter().filter_map(Value::as_f64).collect(),
            _ => Vec::new(),
        })
    }

    pub(super) fn nested<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Value::deserialize(d)? {
            value @ Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        })
    }

    pub(super) fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        })
    }
}
