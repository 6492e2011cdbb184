use crate::kitchen::{menu, Kitchen, MenuItem};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use pronto_telemetry::MetricStore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub store: MetricStore,
    kitchen: Kitchen,
    menu: Vec<MenuItem>,
    start_time: Instant,
}

impl AppState {
    pub fn new(store: MetricStore) -> Self {
        Self {
            store,
            kitchen: Kitchen::new(),
            menu: menu(),
            start_time: Instant::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OrderRequest {
    items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OrderItem {
    title: String,
    price: f64,
}

#[derive(Debug, Serialize)]
struct OrderReceipt {
    id: uuid::Uuid,
    pizzas: u64,
    total_cost: f64,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: uuid::Uuid,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    uptime_seconds: u64,
    active_users: u64,
    requests_served: u64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/menu", get(get_menu))
        .route("/orders", post(create_order))
        .route("/auth/login", post(login))
        .route("/auth/logout", delete(logout))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            track_requests,
        ))
        .with_state(state)
}

/// Times every request, matched or not, and feeds the request counters
/// once the response is ready.
async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().as_str().to_owned();
    let timer = state.store.start_request();

    let response = next.run(request).await;

    state.store.finish_request(timer, &method).await;
    response
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.store.snapshot().await;
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        active_users: snapshot.active_users,
        requests_served: snapshot.requests_total,
    })
}

async fn get_menu(State(state): State<AppState>) -> Json<Vec<MenuItem>> {
    Json(state.menu.clone())
}

async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<OrderRequest>,
) -> Response {
    let pizzas = req.items.len() as u64;
    let total_cost: f64 = req.items.iter().map(|item| item.price).sum();

    let started = Instant::now();
    let outcome = state.kitchen.prepare(pizzas).await;
    state
        .store
        .record_pizza_latency(started.elapsed().as_millis() as u64)
        .await;

    match outcome {
        Ok(()) => {
            state.store.record_purchase(pizzas, total_cost).await;

            let receipt = OrderReceipt {
                id: uuid::Uuid::new_v4(),
                pizzas,
                total_cost,
                status: "baked".to_string(),
                created_at: chrono::Utc::now(),
            };
            info!("Order {}: {} pizzas for ${:.2}", receipt.id, pizzas, total_cost);

            (StatusCode::CREATED, Json(receipt)).into_response()
        }
        Err(e) => {
            state.store.record_pizza_failure().await;
            state.store.record_purchase_failure().await;
            warn!("Order rejected: {}", e);

            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Response {
    let accepted = authenticate(&req.email, &req.password);
    state.store.record_auth(accepted).await;

    if accepted {
        state.store.record_user_join().await;
        info!("Login: {}", req.email);
        (
            StatusCode::OK,
            Json(LoginResponse {
                token: uuid::Uuid::new_v4(),
            }),
        )
            .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid credentials" })),
        )
            .into_response()
    }
}

/// Demo credential check: any non-empty email with the house password.
fn authenticate(email: &str, password: &str) -> bool {
    !email.is_empty() && password == "mozzarella"
}

async fn logout(State(state): State<AppState>) -> StatusCode {
    state.store.record_user_leave().await;
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticate_requires_email_and_house_password() {
        assert!(authenticate("diner@pronto.test", "mozzarella"));
        assert!(!authenticate("diner@pronto.test", "anchovies"));
        assert!(!authenticate("", "mozzarella"));
    }
}
