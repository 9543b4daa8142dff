//! Provider flavors and the record defaults each one implies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::MeterError;

/// Which Google generative AI surface an operation runs against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFlavor {
    /// Google AI Studio (Gemini API, API key auth).
    #[default]
    Google,
    /// Vertex AI (project/location scoped, bearer token auth).
    Vertex,
}

impl ProviderFlavor {
    /// Default `agent` attribution.
    pub fn agent(&self) -> &'static str {
        match self {
            ProviderFlavor::Google => "Google",
            ProviderFlavor::Vertex => "Vertex",
        }
    }

    /// Default `provider` attribution. Both surfaces are billed as Google.
    pub fn provider(&self) -> &'static str {
        "Google"
    }

    /// Default `modelSource` attribution.
    pub fn model_source(&self) -> &'static str {
        match self {
            ProviderFlavor::Google => "GOOGLE",
            ProviderFlavor::Vertex => "GOOGLE_VERTEX_AI",
        }
    }

    /// Default subscriber email, e.g. `user-@google.ai`.
    pub fn placeholder_email(&self) -> String {
        format!("user-@{}.ai", self.agent().to_ascii_lowercase())
    }
}

impl fmt::Display for ProviderFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderFlavor::Google => f.write_str("google"),
            ProviderFlavor::Vertex => f.write_str("vertex"),
        }
    }
}

impl FromStr for ProviderFlavor {
    type Err = MeterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" | "genai" | "gemini" => Ok(ProviderFlavor::Google),
            "vertex" | "vertexai" | "vertex-ai" => Ok(ProviderFlavor::Vertex),
            other => Err(MeterError::Configuration(format!(
                "unknown provider flavor '{other}' (expected 'google' or 'vertex')"
            ))),
        }
    }
}
