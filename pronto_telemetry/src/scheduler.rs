use crate::export::{Exporter, MetricKind};
use crate::sampler::ResourceSampler;
use crate::store::MetricStore;
use std::time::Duration;
use tokio::time;
use tracing::{debug, info};

/// Periodically flushes the store, the host resource readings and the
/// response-time average to the ingestion endpoint.
pub struct ExportScheduler {
    store: MetricStore,
    sampler: ResourceSampler,
    exporter: Exporter,
    period: Duration,
}

impl ExportScheduler {
    pub fn new(
        store: MetricStore,
        sampler: ResourceSampler,
        exporter: Exporter,
        period: Duration,
    ) -> Self {
        Self {
            store,
            sampler,
            exporter,
            period,
        }
    }

    /// Runs forever, one flush per period. Push outcomes are handled inside
    /// the exporter and can never stop the ticker.
    pub async fn run(self) {
        info!(
            "Exporting metrics to {} every {:?}",
            self.exporter.endpoint(),
            self.period
        );

        let mut ticker = time::interval(self.period);
        // the first interval tick completes immediately; skip it so the
        // first flush lands a full period after startup
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.flush().await;
        }
    }

    /// One full export pass: resource gauges, every counter, the latency
    /// gauges, then the drained window average. Issue order is fixed;
    /// completions are not awaited.
    pub async fn flush(&self) {
        self.exporter
            .export("cpu_usage", self.sampler.cpu_percent(), MetricKind::Gauge, "%");
        self.exporter.export(
            "memory_usage",
            self.sampler.memory_percent(),
            MetricKind::Gauge,
            "%",
        );

        let snapshot = self.store.snapshot().await;
        let response_times = self.store.take_response_times().await;

        let sums: [(&str, f64, &str); 13] = [
            ("requests_total", snapshot.requests_total as f64, "1"),
            ("requests_get", snapshot.requests_get as f64, "1"),
            ("requests_post", snapshot.requests_post as f64, "1"),
            ("requests_put", snapshot.requests_put as f64, "1"),
            ("requests_delete", snapshot.requests_delete as f64, "1"),
            ("auth_success", snapshot.auth_success as f64, "1"),
            ("auth_failure", snapshot.auth_failure as f64, "1"),
            ("pizzas_sold", snapshot.pizzas_sold as f64, "1"),
            ("pizza_failures", snapshot.pizza_failures as f64, "1"),
            ("purchase_count", snapshot.purchase_count as f64, "1"),
            ("purchase_failures", snapshot.purchase_failures as f64, "1"),
            ("revenue", snapshot.revenue, "USD"),
            ("total_cost", snapshot.revenue, "USD"),
        ];
        for (name, value, unit) in sums {
            self.exporter.export(name, value, MetricKind::Sum, unit);
        }

        self.exporter.export(
            "active_users",
            snapshot.active_users as f64,
            MetricKind::Gauge,
            "1",
        );
        self.exporter.export(
            "latency",
            snapshot.request_latency_ms as f64,
            MetricKind::Gauge,
            "ms",
        );
        self.exporter.export(
            "pizza_creation_latency",
            snapshot.pizza_latency_ms as f64,
            MetricKind::Gauge,
            "ms",
        );

        // skipped entirely when no purchase landed this period
        if !response_times.is_empty() {
            self.exporter.export(
                "avg_purchase_response_time",
                average_ms(&response_times),
                MetricKind::Gauge,
                "ms",
            );
        }

        debug!("Export pass issued ({} samples drained)", response_times.len());
    }
}

fn average_ms(samples: &[u64]) -> f64 {
    let sum: u64 = samples.iter().sum();
    sum as f64 / samples.len() as f64
}
