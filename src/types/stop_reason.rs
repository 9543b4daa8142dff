//! Closed set of stop reasons accepted by the metering API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Why a generation ended, in the metering API's vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopReason {
    #[default]
    End,
    EndSequence,
    Timeout,
    TokenLimit,
    CostLimit,
    CompletionLimit,
    Error,
    Cancelled,
}

impl StopReason {
    /// Every member, in wire order.
    pub const ALL: [StopReason; 8] = [
        StopReason::End,
        StopReason::EndSequence,
        StopReason::Timeout,
        StopReason::TokenLimit,
        StopReason::CostLimit,
        StopReason::CompletionLimit,
        StopReason::Error,
        StopReason::Cancelled,
    ];

    /// Wire name, e.g. `"TOKEN_LIMIT"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::End => "END",
            StopReason::EndSequence => "END_SEQUENCE",
            StopReason::Timeout => "TIMEOUT",
            StopReason::TokenLimit => "TOKEN_LIMIT",
            StopReason::CostLimit => "COST_LIMIT",
            StopReason::CompletionLimit => "COMPLETION_LIMIT",
            StopReason::Error => "ERROR",
            StopReason::Cancelled => "CANCELLED",
        }
    }

    /// Parse a wire name, warning and falling back to `End` when it is not
    /// a member.
    pub fn validate(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            warn!(
                stop_reason = name,
                fallback = StopReason::End.as_str(),
                "invalid stop reason"
            );
            StopReason::End
        })
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a stop reason wire name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stop reason: {0}")]
pub struct UnknownStopReason(pub String);

impl FromStr for StopReason {
    type Err = UnknownStopReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        StopReason::ALL
            .into_iter()
            .find(|r| r.as_str() == normalized)
            .ok_or_else(|| UnknownStopReason(s.to_string()))
    }
}
