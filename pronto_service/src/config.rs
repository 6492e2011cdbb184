use anyhow::Result;
use pronto_telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    pub telemetry: TelemetryConfig,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

pub async fn load_config(path: impl AsRef<Path>) -> Result<ServiceConfig> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path).await?;

    let extension = path.extension().and_then(|s| s.to_str());

    let config: ServiceConfig = match extension {
        Some("toml") => toml::from_str(&contents)?,
        Some("json") => serde_json::from_str(&contents)?,
        _ => return Err(anyhow::anyhow!("Unsupported config format. Use .toml or .json")),
    };

    config.telemetry.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_toml_config() {
        let toml = r#"
listen_addr = "127.0.0.1:3000"

[telemetry]
endpoint = "https://metrics.example.com/otlp/v1/metrics"
api_key = "user:key"
export_period = "5s"
"#;

        let config: ServiceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:3000");
        assert_eq!(config.telemetry.export_period, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_json_config_with_default_listen_addr() {
        let json = r#"
{
  "telemetry": {
    "endpoint": "http://localhost:9090/ingest",
    "api_key": "token"
  }
}
"#;

        let config: ServiceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.telemetry.export_period, Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn test_load_config_rejects_unknown_extensions() {
        let path = std::env::temp_dir().join("pronto-config-test.yaml");
        tokio::fs::write(&path, "listen_addr: nope").await.unwrap();

        let result = load_config(&path).await;
        assert!(result.is_err());

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn test_load_config_round_trips_a_toml_file() {
        let path = std::env::temp_dir().join("pronto-config-test.toml");
        tokio::fs::write(
            &path,
            r#"
[telemetry]
endpoint = "http://localhost:9090/ingest"
api_key = "token"
"#,
        )
        .await
        .unwrap();

        let config = load_config(&path).await.unwrap();
        assert_eq!(config.telemetry.api_key, "token");

        tokio::fs::remove_file(&path).await.ok();
    }
}
