use crate::presentation::http::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    store: &'static str,
    backend: String,
    version: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_status = match state.store.ping().await {
        Ok(()) => "up",
        Err(e) => {
            tracing::error!("Health check failed: document store unreachable: {}", e);
            "down"
        }
    };

    let (status, code) = if store_status == "up" {
        ("healthy", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    let response = HealthResponse {
        status,
        store: store_status,
        backend: state.config.store_backend.to_string(),
        version: env!("CARGO_PKG_VERSION"),
    };

    (code, Json(response))
}
