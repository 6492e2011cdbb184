pub mod config;
pub mod error;
pub mod export;
pub mod sampler;
pub mod scheduler;
pub mod store;

pub use config::{TelemetryConfig, DEFAULT_EXPORT_PERIOD};
pub use error::{Result, TelemetryError};
pub use export::{Exporter, MetricKind, MetricPoint, MetricValue, MetricsEnvelope};
pub use sampler::ResourceSampler;
pub use scheduler::ExportScheduler;
pub use store::{MetricStore, MetricsSnapshot, RequestTimer};
