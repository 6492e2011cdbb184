use crate::config::TelemetryConfig;
use crate::error::Result;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error};

pub const AGGREGATION_TEMPORALITY_CUMULATIVE: &str = "AGGREGATION_TEMPORALITY_CUMULATIVE";

/// Wire kind of a metric point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Cumulative, monotonic counter.
    Sum,
    /// Latest-value observation.
    Gauge,
}

/// Numeric payload of a data point, already committed to int or double.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum MetricValue {
    #[serde(rename = "asInt")]
    Int(i64),
    #[serde(rename = "asDouble")]
    Double(f64),
}

impl MetricValue {
    /// The ingestion endpoint stores ints and doubles in different columns;
    /// whole values go out as ints, everything else as a double.
    pub fn classify(value: f64) -> Self {
        if value.fract() == 0.0 {
            MetricValue::Int(value as i64)
        } else {
            MetricValue::Double(value)
        }
    }
}

/// One named measurement, built fresh for every push and discarded after.
#[derive(Debug)]
pub struct MetricPoint {
    pub name: String,
    pub unit: String,
    pub kind: MetricKind,
    pub value: MetricValue,
    pub time_unix_nano: u64,
}

impl MetricPoint {
    pub fn new(
        name: impl Into<String>,
        unit: impl Into<String>,
        kind: MetricKind,
        value: f64,
    ) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            kind,
            value: MetricValue::classify(value),
            time_unix_nano: unix_nanos(),
        }
    }

    /// Wraps the point in the resource → scope → metric envelope the
    /// ingestion endpoint expects.
    pub fn into_envelope(self) -> MetricsEnvelope {
        let point = DataPoint {
            value: self.value,
            time_unix_nano: self.time_unix_nano,
        };
        let data = match self.kind {
            MetricKind::Sum => MetricData::Sum {
                data_points: vec![point],
                aggregation_temporality: AGGREGATION_TEMPORALITY_CUMULATIVE,
                is_monotonic: true,
            },
            MetricKind::Gauge => MetricData::Gauge {
                data_points: vec![point],
            },
        };

        MetricsEnvelope {
            resource_metrics: vec![ResourceMetrics {
                scope_metrics: vec![ScopeMetrics {
                    metrics: vec![MetricEntry {
                        name: self.name,
                        unit: self.unit,
                        data,
                    }],
                }],
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsEnvelope {
    resource_metrics: Vec<ResourceMetrics>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourceMetrics {
    scope_metrics: Vec<ScopeMetrics>,
}

#[derive(Debug, Serialize)]
struct ScopeMetrics {
    metrics: Vec<MetricEntry>,
}

#[derive(Debug, Serialize)]
struct MetricEntry {
    name: String,
    unit: String,
    #[serde(flatten)]
    data: MetricData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum MetricData {
    #[serde(rename_all = "camelCase")]
    Sum {
        data_points: Vec<DataPoint>,
        aggregation_temporality: &'static str,
        is_monotonic: bool,
    },
    #[serde(rename_all = "camelCase")]
    Gauge { data_points: Vec<DataPoint> },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DataPoint {
    #[serde(flatten)]
    value: MetricValue,
    time_unix_nano: u64,
}

fn unix_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Pushes metric points to the ingestion endpoint without blocking callers.
#[derive(Debug, Clone)]
pub struct Exporter {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl Exporter {
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fire-and-forget push of one metric value. Returns as soon as the
    /// request task is spawned; the outcome is only ever logged.
    pub fn export(&self, name: &str, value: f64, kind: MetricKind, unit: &str) {
        let point = MetricPoint::new(name, unit, kind, value);
        let exporter = self.clone();
        tokio::spawn(async move {
            let name = point.name.clone();
            if let Err(e) = exporter.push(point).await {
                error!("Error pushing {}: {}", name, e);
            }
        });
    }

    /// Single POST of one envelope. A non-success status is reported with
    /// the response body so the backend's complaint lands in the logs.
    async fn push(&self, point: MetricPoint) -> Result<()> {
        let name = point.name.clone();
        let body = serde_json::to_string(&point.into_envelope())?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        if response.status().is_success() {
            debug!("Pushed {}", name);
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("Failed to push {}: {} {}", name, status, text);
        }

        Ok(())
    }
}
