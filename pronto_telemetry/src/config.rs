use crate::error::{Result, TelemetryError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Interval between export passes when none is configured.
pub const DEFAULT_EXPORT_PERIOD: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Ingestion endpoint the metric envelopes are POSTed to.
    pub endpoint: String,
    /// Bearer token presented to the ingestion endpoint.
    pub api_key: String,
    #[serde(with = "humantime_serde", default = "default_export_period")]
    pub export_period: Duration,
}

fn default_export_period() -> Duration {
    DEFAULT_EXPORT_PERIOD
}

impl TelemetryConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            export_period: DEFAULT_EXPORT_PERIOD,
        }
    }

    pub fn with_export_period(mut self, period: Duration) -> Self {
        self.export_period = period;
        self
    }

    /// Reads `PRONTO_METRICS_URL`, `PRONTO_METRICS_API_KEY` and the optional
    /// `PRONTO_METRICS_PERIOD` from the environment.
    pub fn from_env() -> Result<Self> {
        let endpoint = std::env::var("PRONTO_METRICS_URL")
            .map_err(|_| TelemetryError::InvalidConfig("PRONTO_METRICS_URL is not set".to_string()))?;
        let api_key = std::env::var("PRONTO_METRICS_API_KEY").map_err(|_| {
            TelemetryError::InvalidConfig("PRONTO_METRICS_API_KEY is not set".to_string())
        })?;
        let export_period = match std::env::var("PRONTO_METRICS_PERIOD") {
            Ok(raw) => humantime::parse_duration(&raw).map_err(|e| {
                TelemetryError::InvalidConfig(format!("PRONTO_METRICS_PERIOD: {}", e))
            })?,
            Err(_) => DEFAULT_EXPORT_PERIOD,
        };

        let config = Self {
            endpoint,
            api_key,
            export_period,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(TelemetryError::InvalidConfig(
                "endpoint cannot be empty".to_string(),
            ));
        }

        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(TelemetryError::InvalidConfig(format!(
                "endpoint '{}' must be an http(s) URL",
                self.endpoint
            )));
        }

        if self.api_key.is_empty() {
            return Err(TelemetryError::InvalidConfig(
                "api_key cannot be empty".to_string(),
            ));
        }

        if self.export_period.is_zero() {
            return Err(TelemetryError::InvalidConfig(
                "export_period must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
