//! Response quality score extraction.
//!
//! Signals are read from the first candidate in a fixed priority order, and
//! the first one present wins:
//!
//! 1. `avgLogprobs`, converted with `exp()`
//! 2. `groundingMetadata.groundingSupports[].confidenceScores[]`: mean of
//!    every numeric score across all supports
//! 3. `groundingMetadata.retrievalMetadata.googleSearchDynamicRetrievalScore`
//!
//! Every result is clamped to `[0, 1]`. A caller-supplied score always takes
//! precedence; that is applied by the record builder, not here.

use crate::types::{Candidate, GenerateResponse};

/// Extract a quality score in `[0, 1]`, or `None` when the response carries
/// no usable signal.
pub fn extract(response: &GenerateResponse) -> Option<f64> {
    let candidate = response.first_candidate()?;

    let score = if let Some(logprob) = candidate.avg_logprobs {
        logprob.exp()
    } else if let Some(mean) = grounding_mean(candidate) {
        mean
    } else {
        retrieval_score(candidate)?
    };

    clamp_unit(score)
}

/// Whether [`extract`] would find a signal, without computing it.
///
/// Grounding supports count only when they carry at least one numeric
/// score; a non-empty support list with no scores is not a signal.
pub fn has_signal(response: &GenerateResponse) -> bool {
    response.first_candidate().is_some_and(|candidate| {
        candidate.avg_logprobs.is_some()
            || grounding_scores(candidate).next().is_some()
            || retrieval_score(candidate).is_some()
    })
}

/// Clamp to `[0, 1]`; non-finite input has no meaningful score.
pub(crate) fn clamp_unit(score: f64) -> Option<f64> {
    if score.is_nan() {
        return None;
    }
    Some(score.clamp(0.0, 1.0))
}

fn grounding_scores(candidate: &Candidate) -> impl Iterator<Item = f64> + '_ {
    candidate
        .grounding_metadata
        .iter()
        .flat_map(|g| g.grounding_supports.iter())
        .flat_map(|s| s.confidence_scores.iter().copied())
}

fn grounding_mean(candidate: &Candidate) -> Option<f64> {
    let (sum, count) = grounding_scores(candidate)
        .fold((0.0, 0usize), |(sum, n), score| (sum + score, n + 1));
    (count > 0).then(|| sum / count as f64)
}

fn retrieval_score(candidate: &Candidate) -> Option<f64> {
    candidate
        .grounding_metadata
        .as_ref()?
        .retrieval_metadata
        .as_ref()?
        .google_search_dynamic_retrieval_score
}
