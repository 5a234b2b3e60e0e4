//! Common test utilities for integration tests.

use axum::{
    body::Body,
    http::{Method, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use lw_api::{routes, state::AppState, ApiServer};
use lw_core::{encode_push_body, AssetEventHandler, LabelPolicy, MockRowSink, TableId};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower::ServiceExt;

/// Destination table used by every test router.
pub fn test_table() -> TableId {
    TableId::new("test-project", "activities", "resources")
}

/// Creates an AppState backed by a fresh mock sink.
pub fn create_test_state() -> (AppState, Arc<MockRowSink>) {
    let sink = Arc::new(MockRowSink::new());
    let handler = AssetEventHandler::new(LabelPolicy::default(), test_table(), sink.clone());
    (AppState::new(handler), sink)
}

/// Creates a test router and returns the sink it writes to.
pub fn create_test_router() -> (Router, Arc<MockRowSink>) {
    let (state, sink) = create_test_state();
    (routes::create_router(state), sink)
}

/// Creates the fully layered server router and returns its sink.
pub fn create_server_router() -> (Router, Arc<MockRowSink>) {
    let (state, sink) = create_test_state();
    (ApiServer::with_state(state).router(), sink)
}

/// Asset payload for a Compute Engine instance.
pub fn instance_payload(name: &str, labels: serde_json::Value) -> String {
    serde_json::json!({
        "name": format!("a/b/projects/test-project/zones/us-east1-b/instances/{}", name),
        "assetType": "compute.googleapis.com/Instance",
        "resource": {
            "data": {
                "name": name,
                "id": "1234567890",
                "creationTimestamp": "2024-01-01T00:00:00.000-07:00",
                "machineType": "zones/us-east1-b/machineTypes/n2-standard-4",
                "zone": "projects/test-project/zones/us-east1-b",
                "labels": labels,
                "networkInterfaces": [{"networkIP": "10.128.0.5"}]
            }
        }
    })
    .to_string()
}

/// Wraps a payload in a push envelope body.
pub fn push_body(payload: &str) -> String {
    String::from_utf8_lossy(&encode_push_body(payload, "test-message")).to_string()
}

/// Wraps a payload in a structured-mode CloudEvent body.
pub fn cloud_event_body(payload: &str) -> String {
    serde_json::json!({
        "specversion": "1.0",
        "id": "ce-test",
        "source": "//pubsub.googleapis.com/projects/test-project/topics/assets",
        "type": "google.cloud.pubsub.topic.v1.messagePublished",
        "datacontenttype": "application/json",
        "data": {
            "message": {
                "data": BASE64.encode(payload),
                "messageId": "ce-message"
            },
            "subscription": "projects/test-project/subscriptions/label-warden"
        }
    })
    .to_string()
}

/// Helper to make GET requests.
pub fn get_request(uri: &str) -> axum::extract::Request<Body> {
    axum::extract::Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Helper to make POST requests with JSON body.
pub fn post_request(uri: &str, body: &str) -> axum::extract::Request<Body> {
    axum::extract::Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Sends request and parses the JSON response body.
pub async fn send_request<T: DeserializeOwned>(
    app: Router,
    request: axum::extract::Request<Body>,
) -> (StatusCode, T) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let parsed: T = serde_json::from_slice(&body).unwrap_or_else(|e| {
        panic!(
            "Failed to parse response: {} - Body: {:?}",
            e,
            String::from_utf8_lossy(&body)
        )
    });
    (status, parsed)
}

/// Sends request and returns raw response body.
pub async fn send_request_raw(
    app: Router,
    request: axum::extract::Request<Body>,
) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&body).to_string())
}
