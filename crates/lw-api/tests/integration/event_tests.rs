//! Push delivery endpoint integration tests.

use axum::http::StatusCode;
use lw_api::dto::EventResponse;
use lw_core::{ComplianceStatus, RowInsertError, SinkError};
use serde_json::json;

use super::common::{
    cloud_event_body, create_server_router, create_test_router, instance_payload, post_request,
    push_body, send_request, test_table,
};

#[tokio::test]
async fn test_compliant_instance_is_inserted() {
    let (app, sink) = create_test_router();
    let payload = instance_payload(
        "web-1",
        json!({"owner": "alice", "cost-center": "cc-1", "environment": "prod"}),
    );

    let (status, body): (StatusCode, EventResponse) =
        send_request(app, post_request("/", &push_body(&payload))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.outcome, "inserted");
    assert_eq!(body.detail, "Inserted row for VM: web-1");

    let rows = sink.rows_with_tables().await;
    assert_eq!(rows.len(), 1);
    let (table, row) = &rows[0];
    assert_eq!(table, &test_table());
    assert_eq!(row.vm_name.as_deref(), Some("web-1"));
    assert_eq!(row.vm_id, "1234567890");
    assert_eq!(row.machine_type.as_deref(), Some("n2-standard-4"));
    assert_eq!(row.zone.as_deref(), Some("us-east1-b"));
    assert_eq!(row.project_id.as_deref(), Some("test-project"));
    assert_eq!(row.network_ip.as_deref(), Some("10.128.0.5"));
    assert_eq!(row.compliance_status, ComplianceStatus::Compliant);
    assert_eq!(row.compliance_details, "All required labels are present.");
    assert_eq!(row.raw_payload, payload);
}

#[tokio::test]
async fn test_non_compliant_instance_is_recorded() {
    let (app, sink) = create_test_router();
    let payload = instance_payload("db-7", json!({"owner": "bob"}));

    let (status, body): (StatusCode, EventResponse) =
        send_request(app, post_request("/events", &push_body(&payload))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.outcome, "inserted");

    let rows = sink.rows().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].compliance_status, ComplianceStatus::NonCompliant);
    assert_eq!(
        rows[0].compliance_details,
        "Missing required labels: cost-center, environment"
    );
    assert_eq!(rows[0].labels.as_deref(), Some(r#"{"owner":"bob"}"#));
}

#[tokio::test]
async fn test_other_asset_types_are_skipped() {
    let (app, sink) = create_test_router();
    let payload = json!({
        "name": "//storage.googleapis.com/my-bucket",
        "assetType": "storage.googleapis.com/Bucket",
        "resource": {"data": {"name": "my-bucket"}}
    })
    .to_string();

    let (status, body): (StatusCode, EventResponse) =
        send_request(app, post_request("/", &push_body(&payload))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.outcome, "skipped");
    assert_eq!(body.detail, "Skipped asset type: storage.googleapis.com/Bucket");
    assert_eq!(sink.row_count().await, 0);
    assert_eq!(sink.call_count(), 0);
}

#[tokio::test]
async fn test_malformed_deliveries_are_acknowledged() {
    let bodies = [
        "not json at all".to_string(),
        json!({"message": {"messageId": "1"}}).to_string(),
        json!({"message": {"data": "%%%"}}).to_string(),
        push_body("{truncated"),
        push_body("[1, 2, 3]"),
    ];

    for body in bodies {
        let (app, sink) = create_test_router();
        let (status, response): (StatusCode, EventResponse) =
            send_request(app, post_request("/", &body)).await;

        assert_eq!(status, StatusCode::OK, "body {:?}", body);
        assert_eq!(response.outcome, "malformed", "body {:?}", body);
        assert!(response.detail.starts_with("Malformed message: "));
        assert_eq!(sink.call_count(), 0);
    }
}

#[tokio::test]
async fn test_rejected_row_is_acknowledged() {
    let (app, sink) = create_test_router();
    sink.set_row_errors(vec![RowInsertError::new(
        0,
        "invalid",
        "no such field: extra",
    )])
    .await;
    let payload = instance_payload("web-2", json!({}));

    let (status, body): (StatusCode, EventResponse) =
        send_request(app, post_request("/", &push_body(&payload))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.outcome, "write_rejected");
    assert!(body.detail.contains("web-2"));
    assert!(body.detail.contains("no such field: extra"));
    assert_eq!(sink.row_count().await, 0);
}

#[tokio::test]
async fn test_sink_failure_is_acknowledged() {
    let (app, sink) = create_test_router();
    sink.set_failure(SinkError::Connection("connection refused".to_string()))
        .await;
    let payload = instance_payload("web-3", json!({}));

    let (status, body): (StatusCode, EventResponse) =
        send_request(app, post_request("/", &push_body(&payload))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.outcome, "failed");
    assert!(body.detail.contains("connection refused"));
    assert_eq!(sink.call_count(), 1);
}

#[tokio::test]
async fn test_cloud_event_body_is_accepted() {
    let (app, sink) = create_test_router();
    let payload = instance_payload("ce-vm", json!({"owner": "carol"}));

    let (status, body): (StatusCode, EventResponse) =
        send_request(app, post_request("/", &cloud_event_body(&payload))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.outcome, "inserted");
    let rows = sink.rows().await;
    assert_eq!(rows[0].vm_name.as_deref(), Some("ce-vm"));
    assert_eq!(rows[0].raw_payload, payload);
}

#[tokio::test]
async fn test_get_on_event_route_is_not_allowed() {
    let (app, _sink) = create_test_router();
    let response = tower::ServiceExt::oneshot(app, super::common::get_request("/events"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_large_delivery_through_server_router_is_inserted() {
    let (app, sink) = create_server_router();
    let padding = "x".repeat(3 * 1024 * 1024);
    let payload = instance_payload("big-vm", json!({"owner": padding}));
    let body = push_body(&payload);
    assert!(body.len() > 2 * 1024 * 1024);

    let (status, response): (StatusCode, EventResponse) =
        send_request(app, post_request("/", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response.outcome, "inserted");
    assert_eq!(sink.row_count().await, 1);
}

#[tokio::test]
async fn test_server_router_sets_request_id() {
    let (app, _sink) = create_server_router();
    let payload = instance_payload("web-9", json!({}));

    let response = tower::ServiceExt::oneshot(app, post_request("/", &push_body(&payload)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}
