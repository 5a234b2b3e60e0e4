//! Health, readiness and metrics endpoint integration tests.

use async_trait::async_trait;
use axum::http::StatusCode;
use lw_api::{dto::HealthResponse, dto::ReadinessResponse, routes};
use lw_connectors::{Connector, ConnectorError, ConnectorHealth, ConnectorResult};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::Value;
use std::sync::Arc;

use super::common::{
    create_test_router, create_test_state, get_request, send_request, send_request_raw,
};

/// Connector whose health is fixed at construction.
struct StaticConnector {
    health: Result<ConnectorHealth, ConnectorError>,
}

#[async_trait]
impl Connector for StaticConnector {
    fn name(&self) -> &str {
        "static"
    }

    fn connector_type(&self) -> &str {
        "warehouse"
    }

    async fn health_check(&self) -> ConnectorResult<ConnectorHealth> {
        self.health.clone()
    }
}

fn router_with_connector(health: Result<ConnectorHealth, ConnectorError>) -> axum::Router {
    let (state, _sink) = create_test_state();
    let state = state.with_sink_connector(Arc::new(StaticConnector { health }));
    routes::create_router(state)
}

#[tokio::test]
async fn test_health_endpoint_reports_configuration() {
    let (app, _sink) = create_test_router();

    let (status, body): (StatusCode, HealthResponse) =
        send_request(app, get_request("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.status, "healthy");
    assert_eq!(body.table, "test-project.activities.resources");
    assert_eq!(body.sink, "mock");
    assert_eq!(
        body.required_labels,
        vec!["owner", "cost-center", "environment"]
    );
}

#[tokio::test]
async fn test_live_endpoint_returns_ok() {
    let (app, _sink) = create_test_router();
    let (status, _body) = send_request_raw(app, get_request("/live")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_ready_without_connector() {
    let (app, _sink) = create_test_router();

    let (status, body): (StatusCode, ReadinessResponse) =
        send_request(app, get_request("/ready")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.ready);
    assert_eq!(body.sink_status, "not_checked");
}

#[tokio::test]
async fn test_ready_with_healthy_connector() {
    let app = router_with_connector(Ok(ConnectorHealth::Healthy));

    let (status, body): (StatusCode, ReadinessResponse) =
        send_request(app, get_request("/ready")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.ready);
    assert_eq!(body.sink_status, "healthy");
}

#[tokio::test]
async fn test_ready_with_unhealthy_connector() {
    let app = router_with_connector(Ok(ConnectorHealth::Unhealthy(
        "dataset missing".to_string(),
    )));

    let (status, body): (StatusCode, ReadinessResponse) =
        send_request(app, get_request("/ready")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(!body.ready);
    assert_eq!(body.sink_status, "unhealthy: dataset missing");
}

#[tokio::test]
async fn test_ready_with_failing_connector() {
    let app = router_with_connector(Err(ConnectorError::ConnectionFailed(
        "refused".to_string(),
    )));

    let (status, body): (StatusCode, ReadinessResponse) =
        send_request(app, get_request("/ready")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(!body.ready);
    assert!(body.sink_status.contains("refused"));
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let (app, _sink) = create_test_router();

    let (status, body): (StatusCode, Value) = send_request(app, get_request("/metrics")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_metrics_with_recorder() {
    let recorder = PrometheusBuilder::new().build_recorder();
    let (state, _sink) = create_test_state();
    let app = routes::create_router(state.with_prometheus_handle(recorder.handle()));

    let (status, _body) = send_request_raw(app, get_request("/metrics")).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_returns_not_found() {
    let (app, _sink) = create_test_router();

    let (status, body): (StatusCode, Value) =
        send_request(app, get_request("/nonexistent")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}
