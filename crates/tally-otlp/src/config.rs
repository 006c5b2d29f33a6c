//! Exporter settings from properties or the environment
//!
//! Property keys follow the `otel.exporter.otlp.*` convention. The matching
//! environment variable is the key upper-cased with `.` replaced by `_`,
//! e.g. `OTEL_EXPORTER_OTLP_METRIC_TIMEOUT`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tally_common::ConfigError;

pub const METRIC_TIMEOUT_KEY: &str = "otel.exporter.otlp.metric.timeout";
pub const TIMEOUT_KEY: &str = "otel.exporter.otlp.timeout";
pub const METRIC_ENDPOINT_KEY: &str = "otel.exporter.otlp.metric.endpoint";
pub const ENDPOINT_KEY: &str = "otel.exporter.otlp.endpoint";
pub const INSECURE_KEY: &str = "otel.exporter.otlp.insecure";
pub const HEADERS_KEY: &str = "otel.exporter.otlp.headers";

const ALL_KEYS: [&str; 6] = [
    METRIC_TIMEOUT_KEY,
    TIMEOUT_KEY,
    METRIC_ENDPOINT_KEY,
    ENDPOINT_KEY,
    INSECURE_KEY,
    HEADERS_KEY,
];

/// Exporter overrides. `None` fields leave the builder default untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExporterSettings {
    /// Collector endpoint
    pub endpoint: Option<String>,
    /// Per-call deadline
    pub timeout: Option<Duration>,
    /// Whether to use TLS (`insecure=true` disables it)
    pub use_tls: Option<bool>,
    /// Headers in declaration order
    pub headers: Vec<(String, String)>,
}

impl ExporterSettings {
    /// Read settings from a property map
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let lookup = |primary: &str, fallback: &str| {
            properties
                .get(primary)
                .or_else(|| properties.get(fallback))
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let mut settings = Self::default();

        if let Some(endpoint) = lookup(METRIC_ENDPOINT_KEY, ENDPOINT_KEY) {
            settings.endpoint = Some(endpoint.to_string());
        }

        if let Some(millis) = lookup(METRIC_TIMEOUT_KEY, TIMEOUT_KEY) {
            let millis: u64 = millis.parse().map_err(|_| invalid(METRIC_TIMEOUT_KEY, millis))?;
            settings.timeout = Some(Duration::from_millis(millis));
        }

        if let Some(insecure) = lookup(INSECURE_KEY, INSECURE_KEY) {
            let insecure: bool = insecure
                .to_ascii_lowercase()
                .parse()
                .map_err(|_| invalid(INSECURE_KEY, insecure))?;
            settings.use_tls = Some(!insecure);
        }

        if let Some(headers) = lookup(HEADERS_KEY, HEADERS_KEY) {
            settings.headers = parse_headers(headers)?;
        }

        Ok(settings)
    }

    /// Read settings from the process environment, loading `.env` first if
    /// present
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let properties: HashMap<String, String> = ALL_KEYS
            .iter()
            .filter_map(|key| {
                std::env::var(env_name(key))
                    .ok()
                    .map(|value| (key.to_string(), value))
            })
            .collect();

        Self::from_properties(&properties)
    }
}

/// Environment variable name for a property key
pub fn env_name(key: &str) -> String {
    key.to_ascii_uppercase().replace('.', "_")
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidSetting {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Parse `k=v,k2=v2`
fn parse_headers(raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok((name.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(invalid(HEADERS_KEY, pair)),
        })
        .collect()
}
