//! genai-meter error types

/// genai-meter error types
///
/// Only caller input errors and provider call failures ever reach the caller.
/// Anything that goes wrong while deriving or delivering telemetry is logged
/// and dropped inside the metering pipeline.
#[derive(Debug, thiserror::Error)]
pub enum MeterError {
    // Provider/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("model not found: {0}")]
    ModelNotFound(String),

    // Streaming errors
    #[error("stream error: {0}")]
    Stream(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Soft errors
    #[error("empty response from model")]
    EmptyResponse,
}

impl MeterError {
    /// Map a non-success provider HTTP status to an error.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => MeterError::AuthenticationFailed,
            404 => MeterError::ModelNotFound(body),
            _ => MeterError::Api {
                status,
                message: body,
            },
        }
    }
}

impl From<reqwest::Error> for MeterError {
    fn from(err: reqwest::Error) -> Self {
        MeterError::Http(err.to_string())
    }
}

/// Result type alias for genai-meter operations
pub type Result<T> = std::result::Result<T, MeterError>;
