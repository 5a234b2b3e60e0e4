//! Health check endpoints.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use lw_connectors::ConnectorHealth;
use std::time::Instant;
use tracing::warn;

use crate::dto::{HealthResponse, ReadinessResponse};
use crate::state::AppState;

/// Start time for uptime calculation.
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time.
pub fn init_start_time() {
    START_TIME.get_or_init(Instant::now);
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
}

/// Health check endpoint.
///
/// Reports the process configuration; does not contact the sink.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Process is up", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0);
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        table: state.handler.table().to_string(),
        sink: state.handler.sink_name().to_string(),
        required_labels: state.handler.policy().required_labels().to_vec(),
    })
}

/// Readiness check endpoint.
///
/// Probes the sink connector when one is configured.
#[utoipa::path(
    get,
    path = "/ready",
    responses(
        (status = 200, description = "Ready to accept deliveries", body = ReadinessResponse),
        (status = 503, description = "Sink is unreachable", body = ReadinessResponse)
    ),
    tag = "Health"
)]
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let Some(connector) = &state.sink_connector else {
        return (
            StatusCode::OK,
            Json(ReadinessResponse {
                ready: true,
                sink_status: "not_checked".to_string(),
            }),
        );
    };

    let (ready, sink_status) = match connector.health_check().await {
        Ok(ConnectorHealth::Healthy) => (true, "healthy".to_string()),
        Ok(ConnectorHealth::Degraded(reason)) => (true, format!("degraded: {}", reason)),
        Ok(ConnectorHealth::Unhealthy(reason)) => (false, format!("unhealthy: {}", reason)),
        Ok(ConnectorHealth::Unknown) => (true, "unknown".to_string()),
        Err(e) => (false, format!("error: {}", e)),
    };

    let status = if ready {
        StatusCode::OK
    } else {
        warn!(
            connector = connector.name(),
            connector_type = connector.connector_type(),
            sink_status = %sink_status,
            "Sink connector not ready"
        );
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(ReadinessResponse { ready, sink_status }))
}

/// Liveness check endpoint.
#[utoipa::path(
    get,
    path = "/live",
    responses(
        (status = 200, description = "Process is alive")
    ),
    tag = "Health"
)]
pub async fn liveness_check() -> StatusCode {
    StatusCode::OK
}
