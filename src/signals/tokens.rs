//! Token count normalisation.

use crate::types::{TokenCounts, UsageMetadata};

/// Raw, possibly malformed token counts as a provider reported them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawTokenCounts {
    pub input: Option<f64>,
    pub output: Option<f64>,
    pub total: Option<f64>,
    pub cached: Option<f64>,
    pub reasoning: Option<f64>,
}

impl From<&UsageMetadata> for RawTokenCounts {
    fn from(usage: &UsageMetadata) -> Self {
        Self {
            input: usage.prompt_token_count,
            output: usage.candidates_token_count,
            total: usage.total_token_count,
            cached: usage.cached_content_token_count,
            reasoning: usage.thoughts_token_count,
        }
    }
}

/// Normalise every count to `max(0, floor(raw))`, missing as zero.
///
/// ```rust
/// # use genai_meter::signals::tokens::{normalize, RawTokenCounts};
/// let counts = normalize(RawTokenCounts {
///     input: Some(-3.7),
///     output: Some(7.9),
///     ..Default::default()
/// });
/// assert_eq!(counts.input, 0);
/// assert_eq!(counts.output, 7);
/// ```
pub fn normalize(raw: RawTokenCounts) -> TokenCounts {
    TokenCounts {
        input: count(raw.input),
        output: count(raw.output),
        total: count(raw.total),
        cached: count(raw.cached),
        reasoning: count(raw.reasoning),
    }
}

/// Normalise an optional usage block; absent usage is all zeros.
pub fn normalize_usage(usage: Option<&UsageMetadata>) -> TokenCounts {
    usage
        .map(|u| normalize(RawTokenCounts::from(u)))
        .unwrap_or_default()
}

/// Rough input size for an embedding request whose provider reported no
/// usage: the number of whitespace-separated words. Not a token count.
pub fn estimate_from_words(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

fn count(raw: Option<f64>) -> u64 {
    match raw {
        Some(n) if n.is_finite() && n > 0.0 => n.floor() as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_counts_become_zero() {
        let counts = normalize(RawTokenCounts {
            input: Some(f64::NAN),
            output: Some(f64::INFINITY),
            ..Default::default()
        });
        assert_eq!(counts, TokenCounts::default());
    }

    #[test]
    fn word_estimate_ignores_repeated_whitespace() {
        assert_eq!(estimate_from_words("  the quick\tbrown\n fox "), 4);
        assert_eq!(estimate_from_words(""), 0);
    }
}
