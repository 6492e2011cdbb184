use std::mem;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct StoreInner {
    requests_total: u64,
    requests_get: u64,
    requests_post: u64,
    requests_put: u64,
    requests_delete: u64,
    auth_success: u64,
    auth_failure: u64,
    active_users: u64,
    pizzas_sold: u64,
    pizza_failures: u64,
    purchase_count: u64,
    purchase_failures: u64,
    revenue: f64,
    request_latency_ms: u64,
    pizza_latency_ms: u64,
    response_times_ms: Vec<u64>,
}

/// Shared accumulator for everything the service reports. Counters are
/// cumulative since process start, gauges hold the latest observation, and
/// the response-time window collects samples between export passes.
///
/// Handles are cheap to clone; all of them point at the same state.
#[derive(Debug, Clone, Default)]
pub struct MetricStore {
    inner: Arc<RwLock<StoreInner>>,
}

/// Point-in-time copy of every counter and gauge.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub requests_get: u64,
    pub requests_post: u64,
    pub requests_put: u64,
    pub requests_delete: u64,
    pub auth_success: u64,
    pub auth_failure: u64,
    pub active_users: u64,
    pub pizzas_sold: u64,
    pub pizza_failures: u64,
    pub purchase_count: u64,
    pub purchase_failures: u64,
    pub revenue: f64,
    pub request_latency_ms: u64,
    pub pizza_latency_ms: u64,
}

/// Handed out when a request arrives and consumed when it finishes.
#[derive(Debug)]
pub struct RequestTimer {
    started: Instant,
}

impl RequestTimer {
    fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.read().await;
        MetricsSnapshot {
            requests_total: inner.requests_total,
            requests_get: inner.requests_get,
            requests_post: inner.requests_post,
            requests_put: inner.requests_put,
            requests_delete: inner.requests_delete,
            auth_success: inner.auth_success,
            auth_failure: inner.auth_failure,
            active_users: inner.active_users,
            pizzas_sold: inner.pizzas_sold,
            pizza_failures: inner.pizza_failures,
            purchase_count: inner.purchase_count,
            purchase_failures: inner.purchase_failures,
            revenue: inner.revenue,
            request_latency_ms: inner.request_latency_ms,
            pizza_latency_ms: inner.pizza_latency_ms,
        }
    }

    /// Drains the response-time window. Read and clear happen under one
    /// write lock, so a sample is returned exactly once.
    pub async fn take_response_times(&self) -> Vec<u64> {
        let mut inner = self.inner.write().await;
        mem::take(&mut inner.response_times_ms)
    }

    pub async fn active_users(&self) -> u64 {
        self.inner.read().await.active_users
    }
}

// Instrumentation hooks. The host service calls these on request, auth,
// session and purchase events; they only mutate the store and never touch
// the network.
impl MetricStore {
    pub fn start_request(&self) -> RequestTimer {
        RequestTimer::start()
    }

    /// Counts one finished request and stores its latency. Methods outside
    /// the recognized set still bump the total.
    pub async fn finish_request(&self, timer: RequestTimer, method: &str) {
        let elapsed = timer.elapsed_ms();
        let mut inner = self.inner.write().await;
        inner.requests_total += 1;
        match method {
            "GET" => inner.requests_get += 1,
            "POST" => inner.requests_post += 1,
            "PUT" => inner.requests_put += 1,
            "DELETE" => inner.requests_delete += 1,
            _ => {}
        }
        inner.request_latency_ms = elapsed;
    }

    pub async fn record_auth(&self, success: bool) {
        let mut inner = self.inner.write().await;
        if success {
            inner.auth_success += 1;
        } else {
            inner.auth_failure += 1;
        }
    }

    pub async fn record_user_join(&self) {
        self.inner.write().await.active_users += 1;
    }

    /// Decrementing an already-empty session count is a no-op.
    pub async fn record_user_leave(&self) {
        let mut inner = self.inner.write().await;
        inner.active_users = inner.active_users.saturating_sub(1);
    }

    pub async fn record_pizza_latency(&self, elapsed_ms: u64) {
        self.inner.write().await.pizza_latency_ms = elapsed_ms;
    }

    pub async fn record_pizza_failure(&self) {
        self.inner.write().await.pizza_failures += 1;
    }

    /// Books one completed order: order count, pizzas sold, revenue, and a
    /// response-time sample taken from the current pizza-creation latency.
    pub async fn record_purchase(&self, pizzas: u64, total_cost: f64) {
        let mut inner = self.inner.write().await;
        inner.purchase_count += 1;
        inner.pizzas_sold += pizzas;
        inner.revenue += total_cost;
        let sample = inner.pizza_latency_ms;
        inner.response_times_ms.push(sample);
    }

    pub async fn record_purchase_failure(&self) {
        self.inner.write().await.purchase_failures += 1;
    }
}
