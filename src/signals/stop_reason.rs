//! Provider finish reason → [`StopReason`].

use tracing::warn;

use crate::types::{GenerateResponse, StopReason};

/// Map a provider finish reason to a stop reason.
///
/// Never fails. Missing, empty, unspecified (`FINISH_REASON_UNSPECIFIED`,
/// `OTHER`, `IMAGE_OTHER`) and unrecognised reasons resolve to `fallback`;
/// unrecognised ones also log a warning so new provider values get noticed.
///
/// ```rust
/// # use genai_meter::StopReason;
/// # use genai_meter::signals::stop_reason::resolve;
/// assert_eq!(resolve(Some(" max_tokens "), StopReason::End), StopReason::TokenLimit);
/// assert_eq!(resolve(None, StopReason::Error), StopReason::Error);
/// ```
pub fn resolve(raw: Option<&str>, fallback: StopReason) -> StopReason {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return fallback;
    };

    match raw.to_ascii_uppercase().as_str() {
        "STOP" => StopReason::End,

        "MAX_TOKENS" => StopReason::TokenLimit,

        // safety and content policy blocks
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" | "MODEL_ARMOR"
        | "IMAGE_SAFETY" | "IMAGE_PROHIBITED_CONTENT" | "IMAGE_RECITATION" => StopReason::Error,

        // bad tool usage
        "MALFORMED_FUNCTION_CALL" | "UNEXPECTED_TOOL_CALL" | "NO_IMAGE" => StopReason::Error,

        "CANCELLED" | "CANCELED" => StopReason::Cancelled,

        "FINISH_REASON_UNSPECIFIED" | "OTHER" | "IMAGE_OTHER" => fallback,

        _ => {
            warn!(
                finish_reason = raw,
                fallback = fallback.as_str(),
                "unmapped finish reason, using fallback"
            );
            fallback
        }
    }
}

/// Like [`resolve`], with the fallback given by wire name. A fallback that is
/// not a stop reason silently becomes `END`.
pub fn resolve_with_fallback_name(raw: Option<&str>, fallback: &str) -> StopReason {
    let fallback = fallback.parse().unwrap_or(StopReason::End);
    resolve(raw, fallback)
}

/// Raw finish reason of a response: first candidate's, else the top-level
/// field.
pub fn finish_reason(response: &GenerateResponse) -> Option<&str> {
    response
        .first_candidate()
        .and_then(|c| c.finish_reason.as_deref())
        .filter(|r| !r.is_empty())
        .or(response.finish_reason.as_deref())
}

/// Resolve the stop reason of a response, falling back to `END`.
pub fn from_response(response: &GenerateResponse) -> StopReason {
    resolve(finish_reason(response), StopReason::End)
}
