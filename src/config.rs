//! Configuration for the metering pipeline and the bundled provider client.
//!
//! Values resolve in this order, later wins:
//! 1. built-in defaults
//! 2. a TOML file (`cli` feature; `--config <path>` or
//!    `~/.genai-meter/config.toml`)
//! 3. environment variables
//!
//! | Variable | Field |
//! |---|---|
//! | `REVENIUM_METERING_API_KEY` | `metering.api_key` |
//! | `REVENIUM_METERING_BASE_URL` | `metering.base_url` |
//! | `REVENIUM_LOG_LEVEL` | `log_level` |
//! | `GOOGLE_API_KEY` | `provider.api_key` |
//! | `GOOGLE_CLOUD_PROJECT` | `provider.project` |
//! | `GOOGLE_CLOUD_LOCATION` | `provider.location` |
//! | `CLOUDSDK_AUTH_ACCESS_TOKEN` | `provider.access_token` |

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, warn};

use crate::metering::DEFAULT_BASE_URL;
use crate::types::ProviderFlavor;
use crate::{MeterError, Result};

pub const ENV_METERING_API_KEY: &str = "REVENIUM_METERING_API_KEY";
pub const ENV_METERING_BASE_URL: &str = "REVENIUM_METERING_BASE_URL";
pub const ENV_LOG_LEVEL: &str = "REVENIUM_LOG_LEVEL";
pub const ENV_GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const ENV_GOOGLE_CLOUD_PROJECT: &str = "GOOGLE_CLOUD_PROJECT";
pub const ENV_GOOGLE_CLOUD_LOCATION: &str = "GOOGLE_CLOUD_LOCATION";
pub const ENV_GOOGLE_APPLICATION_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const ENV_ACCESS_TOKEN: &str = "CLOUDSDK_AUTH_ACCESS_TOKEN";

/// Vertex AI location used when none is configured.
pub const DEFAULT_LOCATION: &str = "us-central1";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeterConfig {
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default)]
    pub metering: MeteringConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

/// Metering endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MeteringConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    /// Metering API base URL (default: https://api.revenium.ai).
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for MeteringConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Google provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub flavor: ProviderFlavor,
    /// Google AI Studio API key.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Vertex AI project id.
    #[serde(default)]
    pub project: Option<String>,
    /// Vertex AI location (default: us-central1).
    #[serde(default = "default_location")]
    pub location: String,
    /// Pre-minted OAuth access token for Vertex AI.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Override the provider API base URL.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            flavor: ProviderFlavor::default(),
            api_key: None,
            project: None,
            location: default_location(),
            access_token: None,
            base_url: None,
        }
    }
}

fn default_location() -> String {
    DEFAULT_LOCATION.to_string()
}

impl MeterConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Overlay the process environment onto this configuration.
    pub fn with_env(self) -> Self {
        self.with_lookup(|name| std::env::var(name).ok())
    }

    /// Overlay values from `lookup` (an environment stand-in). Unset and
    /// blank variables leave the current value alone.
    pub fn with_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(key) = get(ENV_METERING_API_KEY) {
            self.metering.api_key = Some(key);
        }
        if let Some(url) = get(ENV_METERING_BASE_URL) {
            self.metering.base_url = url;
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            self.log_level = LogLevel::parse_lenient(&level);
        }
        if let Some(key) = get(ENV_GOOGLE_API_KEY) {
            self.provider.api_key = Some(key);
        }
        if let Some(project) = get(ENV_GOOGLE_CLOUD_PROJECT) {
            self.provider.project = Some(project);
        }
        if let Some(location) = get(ENV_GOOGLE_CLOUD_LOCATION) {
            self.provider.location = location;
        }
        if let Some(token) = get(ENV_ACCESS_TOKEN) {
            self.provider.access_token = Some(token);
        }
        self
    }

    /// Load configuration from a TOML file.
    ///
    /// Resolution order:
    /// 1. Explicit path (must exist)
    /// 2. `~/.genai-meter/config.toml`
    ///
    /// Without an explicit path and without a user file, defaults are used.
    #[cfg(feature = "cli")]
    pub fn load(explicit_path: Option<&std::path::Path>) -> Result<Self> {
        let path = match explicit_path {
            Some(path) if path.exists() => path.to_path_buf(),
            Some(path) => {
                return Err(MeterError::Configuration(format!(
                    "Config file not found: {path:?}"
                )));
            }
            None => match dirs::home_dir()
                .map(|home| home.join(".genai-meter").join("config.toml"))
                .filter(|path| path.exists())
            {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path).map_err(|e| {
            MeterError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::parse(&content).map_err(|e| {
            MeterError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Parse configuration from TOML text.
    #[cfg(feature = "cli")]
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| MeterError::Configuration(e.to_string()))
    }

    /// Check that the configuration can reach the metering API.
    pub fn validate(&self) -> Result<()> {
        match self.metering.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(()),
            _ => Err(MeterError::Configuration(format!(
                "{ENV_METERING_API_KEY} is not set"
            ))),
        }
    }
}

/// Log which environment variables `flavor` needs but the process lacks.
///
/// Never fails; returns the names of the missing required variables.
pub fn verify_environment(flavor: ProviderFlavor) -> Vec<&'static str> {
    verify_with(flavor, |name| std::env::var(name).ok())
}

/// [`verify_environment`] against an arbitrary variable lookup.
pub fn verify_with<F>(flavor: ProviderFlavor, lookup: F) -> Vec<&'static str>
where
    F: Fn(&str) -> Option<String>,
{
    let is_set = |name: &str| lookup(name).is_some_and(|value| !value.trim().is_empty());
    let mut missing = Vec::new();

    if !is_set(ENV_METERING_API_KEY) {
        error!("{ENV_METERING_API_KEY} is not set");
        missing.push(ENV_METERING_API_KEY);
    }
    if !is_set(ENV_METERING_BASE_URL) {
        debug!("{ENV_METERING_BASE_URL} is not set; defaulting to {DEFAULT_BASE_URL}");
    }

    match flavor {
        ProviderFlavor::Google => {
            if !is_set(ENV_GOOGLE_API_KEY) {
                error!("{ENV_GOOGLE_API_KEY} is not set");
                missing.push(ENV_GOOGLE_API_KEY);
            }
        }
        ProviderFlavor::Vertex => {
            if !is_set(ENV_GOOGLE_CLOUD_PROJECT) {
                error!("{ENV_GOOGLE_CLOUD_PROJECT} is not set");
                missing.push(ENV_GOOGLE_CLOUD_PROJECT);
            }
            if !is_set(ENV_GOOGLE_APPLICATION_CREDENTIALS) && !is_set(ENV_ACCESS_TOKEN) {
                error!(
                    "neither {ENV_GOOGLE_APPLICATION_CREDENTIALS} nor {ENV_ACCESS_TOKEN} is set"
                );
                missing.push(ENV_GOOGLE_APPLICATION_CREDENTIALS);
            }
            if !is_set(ENV_GOOGLE_CLOUD_LOCATION) {
                warn!("{ENV_GOOGLE_CLOUD_LOCATION} is not set; defaulting to {DEFAULT_LOCATION}");
            }
        }
    }

    missing
}

/// Log verbosity, as spelled in `REVENIUM_LOG_LEVEL`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Parse `s`, falling back to `Info` with a warning.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| {
            warn!(level = s, "invalid log level, using INFO");
            LogLevel::Info
        })
    }

    /// Equivalent `tracing` filter.
    pub fn as_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = MeterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(MeterError::Configuration(format!("unknown log level '{s}'"))),
        }
    }
}

impl From<String> for LogLevel {
    fn from(s: String) -> Self {
        LogLevel::parse_lenient(&s)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = MeterConfig::default();
        assert_eq!(config.metering.base_url, "https://api.revenium.ai");
        assert_eq!(config.provider.location, "us-central1");
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.validate().is_err());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = MeterConfig::default().with_lookup(env(&[
            (ENV_METERING_API_KEY, "hak_test"),
            (ENV_METERING_BASE_URL, "http://localhost:9999"),
            (ENV_LOG_LEVEL, "debug"),
            (ENV_GOOGLE_CLOUD_LOCATION, ""),
        ]));
        assert_eq!(config.metering.api_key.as_deref(), Some("hak_test"));
        assert_eq!(config.metering.base_url, "http://localhost:9999");
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.provider.location, "us-central1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_log_level_falls_back_to_info() {
        assert_eq!(LogLevel::parse_lenient("verbose"), LogLevel::Info);
        assert_eq!(LogLevel::parse_lenient("warning"), LogLevel::Warning);
        assert_eq!(LogLevel::Warning.as_filter(), LevelFilter::WARN);
    }

    #[test]
    fn vertex_verification_reports_missing_variables() {
        let missing = verify_with(
            ProviderFlavor::Vertex,
            env(&[(ENV_METERING_API_KEY, "hak_test"), (ENV_ACCESS_TOKEN, "ya29")]),
        );
        assert_eq!(missing, vec![ENV_GOOGLE_CLOUD_PROJECT]);
    }

    #[test]
    fn google_verification_needs_api_key() {
        let missing = verify_with(ProviderFlavor::Google, env(&[]));
        assert_eq!(missing, vec![ENV_METERING_API_KEY, ENV_GOOGLE_API_KEY]);
    }
}
