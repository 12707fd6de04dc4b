//! Liveness and metrics over HTTP.

use crate::exposition;
use axum::{extract::State, http::header, response::IntoResponse, routing::get, Json, Router};
use costar_core::{InMemoryMetrics, MetricsSnapshot};
use std::sync::Arc;

/// `GET /health`, `GET /metrics` (Prometheus text) and `GET /metrics.json`
/// backed by `metrics`.
pub fn router(metrics: Arc<InMemoryMetrics>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(prometheus_handler))
        .route("/metrics.json", get(snapshot_handler))
        .with_state(metrics)
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok", "service": "costar"}))
}

async fn prometheus_handler(State(metrics): State<Arc<InMemoryMetrics>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, exposition::CONTENT_TYPE)],
        exposition::render(&metrics.snapshot()),
    )
}

async fn snapshot_handler(State(metrics): State<Arc<InMemoryMetrics>>) -> Json<MetricsSnapshot> {
    Json(metrics.snapshot())
}
