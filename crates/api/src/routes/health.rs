use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    backend_healthy: bool,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let backend_healthy = state.backend.health_check().await.is_ok();
    Json(HealthResponse {
        status: if backend_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        backend_healthy,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
