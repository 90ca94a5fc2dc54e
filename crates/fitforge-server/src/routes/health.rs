//! Liveness/readiness endpoints (SPEC_FULL.md §5, grounded in
//! `fraiseql-server::routes::health`).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Always `200 OK` unless the process has actually panicked; used by an
/// orchestrator's liveness probe to decide whether to restart the container.
pub async fn liveness() -> impl IntoResponse {
    Json(LivenessResponse { status: "ok", version: env!("CARGO_PKG_VERSION") })
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
}

/// `503` once shutdown has been requested, so a load balancer stops routing
/// new traffic here while in-flight requests drain.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if state.shutdown.is_shutdown_requested() {
        (StatusCode::SERVICE_UNAVAILABLE, Json(ReadinessResponse { status: "draining" }))
    } else {
        (StatusCode::OK, Json(ReadinessResponse { status: "ready" }))
    }
}
