//! Signal derivation from raw provider responses.
//!
//! These modules are the only code that reads provider response shapes.
//! Everything they return is already normalised: token counts are
//! non-negative integers, stop reasons are members of the closed enum, and
//! quality scores lie in `[0, 1]`.

pub mod confidence;
pub mod stop_reason;
pub mod tokens;

use crate::types::{EmbedResponse, GenerateResponse, StopReason, TokenCounts};

/// How an observed stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The producer ran to completion.
    Exhausted,
    /// The producer yielded an error.
    Failed,
    /// The consumer dropped the stream before it finished.
    Abandoned,
}

/// Everything derived from the provider side of one operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderSignals {
    pub tokens: TokenCounts,
    pub stop_reason: StopReason,
    pub quality_score: Option<f64>,
    /// Provider-side failure observed during the operation.
    pub error_reason: Option<String>,
}

impl ProviderSignals {
    /// Signals of a complete, non-streamed response.
    pub fn from_response(response: &GenerateResponse) -> Self {
        Self {
            tokens: tokens::normalize_usage(response.usage_metadata.as_ref()),
            stop_reason: stop_reason::from_response(response),
            quality_score: confidence::extract(response),
            error_reason: None,
        }
    }

    /// Signals of a stream, read from the last chunk only (Gemini reports
    /// cumulative usage on the final chunk).
    ///
    /// When the last chunk carries no finish reason, a failed stream resolves
    /// to `ERROR` and an abandoned one to `CANCELLED`.
    pub fn from_stream(
        last_chunk: Option<&GenerateResponse>,
        end: StreamEnd,
        error: Option<String>,
    ) -> Self {
        let fallback = match end {
            StreamEnd::Exhausted => StopReason::End,
            StreamEnd::Failed => StopReason::Error,
            StreamEnd::Abandoned => StopReason::Cancelled,
        };
        let Some(chunk) = last_chunk else {
            return Self {
                stop_reason: fallback,
                error_reason: error,
                ..Self::default()
            };
        };
        Self {
            tokens: tokens::normalize_usage(chunk.usage_metadata.as_ref()),
            stop_reason: stop_reason::resolve(stop_reason::finish_reason(chunk), fallback),
            quality_score: confidence::extract(chunk),
            error_reason: error,
        }
    }

    /// Signals of an embedding call.
    ///
    /// Without provider usage the input size is estimated from the word count
    /// of `input` (see [`tokens::estimate_from_words`]). Provider usage that
    /// reports no total is totalled as input plus output, so the record never
    /// carries a zero total next to non-zero parts.
    pub fn from_embedding(response: &EmbedResponse, input: &str) -> Self {
        let tokens = match &response.usage_metadata {
            Some(usage) => {
                let mut counts = tokens::normalize(usage.into());
                if counts.total == 0 {
                    counts.total = counts.input.saturating_add(counts.output);
                }
                counts
            }
            None => {
                let estimate = tokens::estimate_from_words(input);
                TokenCounts {
                    input: estimate,
                    total: estimate,
                    ..TokenCounts::default()
                }
            }
        };
        Self {
            tokens,
            stop_reason: StopReason::End,
            quality_score: None,
            error_reason: None,
        }
    }
}
