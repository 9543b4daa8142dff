//! Values returned to the caller by metered operations.

use serde::{Deserialize, Serialize};

use super::response::{EmbedResponse, GenerateResponse};

/// Token usage as reported back to the caller (provider values, missing
/// fields read as zero).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub prompt_token_count: u64,
    pub candidates_token_count: u64,
    pub total_token_count: u64,
    pub thoughts_token_count: u64,
}

/// One answered chat turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    pub text: String,
    pub model_version: String,
    pub response_id: String,
    pub usage_metadata: UsageSummary,
}

impl ChatTurn {
    pub(crate) fn from_response(response: &GenerateResponse) -> Self {
        let counts = crate::signals::tokens::normalize_usage(response.usage_metadata.as_ref());
        Self {
            text: response.output_text(),
            model_version: response.model_version.clone().unwrap_or_default(),
            response_id: response.response_id.clone().unwrap_or_default(),
            usage_metadata: UsageSummary {
                prompt_token_count: counts.input,
                candidates_token_count: counts.output,
                total_token_count: counts.total,
                thoughts_token_count: counts.reasoning,
            },
        }
    }
}

/// Result of a multi-prompt chat: the conversation history (one text per
/// turn, user and model alternating) and one response per prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatTranscript {
    pub histories: Vec<String>,
    pub responses: Vec<ChatTurn>,
}

/// Result of an embedding call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingOutcome {
    pub embedding: Vec<f32>,
    pub model_version: String,
    pub prompt_token_count: u64,
    pub total_token_count: u64,
}

impl EmbeddingOutcome {
    pub(crate) fn new(response: EmbedResponse, model: &str, input: u64, total: u64) -> Self {
        Self {
            embedding: response.values,
            model_version: response.model_version.unwrap_or_else(|| model.to_string()),
            prompt_token_count: input,
            total_token_count: total,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.embedding.len()
    }
}
