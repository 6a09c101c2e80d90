use crate::services::get_metrics;
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Liveness probe.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "tenant-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe: the identity back-end and data partition answer.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let (identity, partition) = tokio::join!(
        state.identity.health_check(),
        state.partition.health_check()
    );

    match identity.and(partition) {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "error": e.to_string() })),
            )
        }
    }
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
