use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use pronto_telemetry::{ExportScheduler, Exporter, MetricStore, ResourceSampler, TelemetryConfig};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct IngestState {
    received: Arc<Mutex<Vec<Value>>>,
    auth_headers: Arc<Mutex<Vec<String>>>,
    reject_name: Option<String>,
}

async fn ingest(
    State(state): State<IngestState>,
    headers: HeaderMap,
    Json(envelope): Json<Value>,
) -> (StatusCode, String) {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.auth_headers.lock().await.push(bearer);

    let name = metric_name(&envelope);
    let rejected = state.reject_name.as_deref() == Some(name.as_str());
    state.received.lock().await.push(envelope);

    if rejected {
        (StatusCode::INTERNAL_SERVER_ERROR, "synthetic outage".to_string())
    } else {
        (StatusCode::OK, String::new())
    }
}

async fn spawn_ingest(reject_name: Option<&str>) -> (String, IngestState) {
    let state = IngestState {
        reject_name: reject_name.map(str::to_string),
        ..IngestState::default()
    };
    let app = Router::new()
        .route("/", post(ingest))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

fn metric_name(envelope: &Value) -> String {
    envelope["resourceMetrics"][0]["scopeMetrics"][0]["metrics"][0]["name"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

fn metric_body(envelope: &Value) -> &Value {
    &envelope["resourceMetrics"][0]["scopeMetrics"][0]["metrics"][0]
}

async fn wait_for_envelopes(state: &IngestState, count: usize) -> Vec<Value> {
    for _ in 0..200 {
        let received = state.received.lock().await.clone();
        if received.len() >= count {
            return received;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!(
        "timed out waiting for {} envelopes, got {}",
        count,
        state.received.lock().await.len()
    );
}

fn find<'a>(envelopes: &'a [Value], name: &str) -> &'a Value {
    envelopes
        .iter()
        .find(|e| metric_name(e) == name)
        .unwrap_or_else(|| panic!("no envelope named {}", name))
}

#[tokio::test]
async fn test_full_pass_reaches_the_ingest_endpoint() {
    let (endpoint, ingest) = spawn_ingest(None).await;
    let config = TelemetryConfig::new(endpoint, "test-token");

    let store = MetricStore::new();
    for method in ["GET", "GET", "POST", "PUT", "DELETE"] {
        let timer = store.start_request();
        store.finish_request(timer, method).await;
    }
    store.record_auth(true).await;
    store.record_auth(false).await;
    store.record_user_join().await;
    store.record_user_join().await;
    store.record_user_leave().await;
    store.record_pizza_latency(100).await;
    store.record_purchase(1, 10.0).await;
    store.record_pizza_latency(200).await;
    store.record_purchase(2, 20.0).await;
    store.record_pizza_latency(301).await;
    store.record_purchase(3, 30.0).await;
    store.record_pizza_failure().await;
    store.record_purchase_failure().await;

    let scheduler = ExportScheduler::new(
        store.clone(),
        ResourceSampler::new(),
        Exporter::new(&config),
        config.export_period,
    );
    scheduler.flush().await;

    // 2 resource gauges + 13 sums + 3 gauges + the window average
    let envelopes = wait_for_envelopes(&ingest, 19).await;
    assert_eq!(envelopes.len(), 19);

    let requests = metric_body(find(&envelopes, "requests_total"));
    assert_eq!(requests["sum"]["dataPoints"][0]["asInt"], 5);
    assert_eq!(requests["unit"], "1");

    let gets = metric_body(find(&envelopes, "requests_get"));
    assert_eq!(gets["sum"]["dataPoints"][0]["asInt"], 2);

    let auth_success = metric_body(find(&envelopes, "auth_success"));
    assert_eq!(auth_success["sum"]["dataPoints"][0]["asInt"], 1);

    let pizzas = metric_body(find(&envelopes, "pizzas_sold"));
    assert_eq!(pizzas["sum"]["dataPoints"][0]["asInt"], 6);

    // both purchase totals report the same accumulator
    let revenue = metric_body(find(&envelopes, "revenue"));
    assert_eq!(revenue["sum"]["dataPoints"][0]["asInt"], 60);
    assert_eq!(revenue["unit"], "USD");
    let total_cost = metric_body(find(&envelopes, "total_cost"));
    assert_eq!(total_cost["sum"]["dataPoints"][0]["asInt"], 60);

    let active = metric_body(find(&envelopes, "active_users"));
    assert_eq!(active["gauge"]["dataPoints"][0]["asInt"], 1);

    // mean of [100, 200, 301] is fractional, so it rides as a double
    let average = metric_body(find(&envelopes, "avg_purchase_response_time"));
    let mean = average["gauge"]["dataPoints"][0]["asDouble"].as_f64().unwrap();
    assert!((mean - 601.0 / 3.0).abs() < 1e-9);
    assert_eq!(average["unit"], "ms");

    let cpu = metric_body(find(&envelopes, "cpu_usage"));
    assert_eq!(cpu["unit"], "%");
    assert!(cpu.get("gauge").is_some());
    assert!(metric_body(find(&envelopes, "memory_usage")).get("gauge").is_some());

    // every sum carries the cumulative flags, no gauge does
    for envelope in &envelopes {
        let metric = metric_body(envelope);
        match (metric.get("sum"), metric.get("gauge")) {
            (Some(sum), None) => {
                assert_eq!(sum["aggregationTemporality"], "AGGREGATION_TEMPORALITY_CUMULATIVE");
                assert_eq!(sum["isMonotonic"], true);
                assert!(sum["dataPoints"][0]["timeUnixNano"].as_u64().unwrap() > 0);
            }
            (None, Some(gauge)) => {
                assert!(gauge.get("aggregationTemporality").is_none());
                assert!(gauge["dataPoints"][0]["timeUnixNano"].as_u64().unwrap() > 0);
            }
            other => panic!("{}: expected exactly one data block, got {:?}", metric_name(envelope), other),
        }
    }

    for bearer in ingest.auth_headers.lock().await.iter() {
        assert_eq!(bearer, "Bearer test-token");
    }

    // the window belongs to the pass that drained it
    assert!(store.take_response_times().await.is_empty());
}

#[tokio::test]
async fn test_rejected_push_does_not_stall_the_pass() {
    let (endpoint, ingest) = spawn_ingest(Some("cpu_usage")).await;
    let config = TelemetryConfig::new(endpoint, "test-token");

    let store = MetricStore::new();
    let timer = store.start_request();
    store.finish_request(timer, "GET").await;

    let scheduler = ExportScheduler::new(
        store,
        ResourceSampler::new(),
        Exporter::new(&config),
        config.export_period,
    );
    scheduler.flush().await;

    // no purchases this period, so no window average
    let envelopes = wait_for_envelopes(&ingest, 18).await;

    assert!(envelopes.iter().any(|e| metric_name(e) == "memory_usage"));
    assert!(envelopes.iter().any(|e| metric_name(e) == "requests_total"));
    assert!(!envelopes.iter().any(|e| metric_name(e) == "avg_purchase_response_time"));
}

#[tokio::test]
async fn test_scheduler_flushes_on_every_tick() {
    let (endpoint, ingest) = spawn_ingest(None).await;
    let config =
        TelemetryConfig::new(endpoint, "test-token").with_export_period(Duration::from_millis(50));

    let store = MetricStore::new();
    let scheduler = ExportScheduler::new(
        store.clone(),
        ResourceSampler::new(),
        Exporter::new(&config),
        config.export_period,
    );
    let ticker = tokio::spawn(scheduler.run());

    // two passes of 18 metrics each once the ticker has fired twice
    wait_for_envelopes(&ingest, 36).await;
    ticker.abort();
}
