//! Asset event handler.
//!
//! [`AssetEventHandler`] runs one push delivery through decode, gate,
//! extraction, policy check and a single row append. Every failure is
//! absorbed into an [`EventOutcome`]; nothing is retried.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, Instrument};

use crate::compliance::LabelPolicy;
use crate::envelope::{parse_push_body, AssetPayload, PubSubMessage};
use crate::extract::extract_vm_details;
use crate::models::{OutputRecord, TableId};
use crate::sink::{RowInsertError, RowSink};

const UNKNOWN_VM: &str = "Unknown VM";

/// Result of handling one delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EventOutcome {
    /// One row was appended.
    Inserted { vm_name: Option<String> },
    /// The asset is not a compute instance.
    Skipped { asset_type: Option<String> },
    /// The delivery could not be decoded.
    Malformed { reason: String },
    /// The store rejected the row.
    WriteRejected {
        vm_name: Option<String>,
        errors: Vec<RowInsertError>,
    },
    /// The append call failed.
    Failed { reason: String },
}

impl EventOutcome {
    /// Short machine-readable name, used as a metric label.
    pub fn label(&self) -> &'static str {
        match self {
            EventOutcome::Inserted { .. } => "inserted",
            EventOutcome::Skipped { .. } => "skipped",
            EventOutcome::Malformed { .. } => "malformed",
            EventOutcome::WriteRejected { .. } => "write_rejected",
            EventOutcome::Failed { .. } => "failed",
        }
    }

    /// Human-readable description.
    pub fn detail(&self) -> String {
        match self {
            EventOutcome::Inserted { vm_name } => format!(
                "Inserted row for VM: {}",
                vm_name.as_deref().unwrap_or(UNKNOWN_VM)
            ),
            EventOutcome::Skipped { asset_type } => format!(
                "Skipped asset type: {}",
                asset_type.as_deref().unwrap_or("none")
            ),
            EventOutcome::Malformed { reason } => format!("Malformed message: {}", reason),
            EventOutcome::WriteRejected { vm_name, errors } => format!(
                "Row rejected for VM {}: {}",
                vm_name.as_deref().unwrap_or(UNKNOWN_VM),
                errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            EventOutcome::Failed { reason } => format!("Unexpected error: {}", reason),
        }
    }

    /// Returns true when a row was written.
    pub fn is_inserted(&self) -> bool {
        matches!(self, EventOutcome::Inserted { .. })
    }
}

/// Handles asset change deliveries against a fixed table and policy.
#[derive(Clone)]
pub struct AssetEventHandler {
    policy: Arc<LabelPolicy>,
    table: TableId,
    sink: Arc<dyn RowSink>,
}

impl AssetEventHandler {
    /// Creates a handler.
    pub fn new(policy: LabelPolicy, table: TableId, sink: Arc<dyn RowSink>) -> Self {
        Self {
            policy: Arc::new(policy),
            table,
            sink,
        }
    }

    /// Returns the destination table.
    pub fn table(&self) -> &TableId {
        &self.table
    }

    /// Returns the label policy.
    pub fn policy(&self) -> &LabelPolicy {
        &self.policy
    }

    /// Returns the sink name.
    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    /// Handles a push delivery body, stamping rows with the current time.
    pub async fn handle(&self, body: &[u8]) -> EventOutcome {
        self.handle_at(body, Utc::now()).await
    }

    /// Handles a push delivery body, stamping rows with `ingested_at`.
    pub async fn handle_at(&self, body: &[u8], ingested_at: DateTime<Utc>) -> EventOutcome {
        let envelope = match parse_push_body(body) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(error = %e, "Error decoding push delivery");
                return EventOutcome::Malformed {
                    reason: e.to_string(),
                };
            }
        };

        let message_id = envelope.message.message_id.clone().unwrap_or_default();
        let span = info_span!("asset_event", message_id = %message_id);
        self.process(envelope.message, ingested_at)
            .instrument(span)
            .await
    }

    async fn process(&self, message: PubSubMessage, ingested_at: DateTime<Utc>) -> EventOutcome {
        let raw_payload = match message.payload_text() {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Error decoding Pub/Sub message data");
                return EventOutcome::Malformed {
                    reason: e.to_string(),
                };
            }
        };
        debug!(raw_message = %raw_payload, "Received raw message");

        let payload = match AssetPayload::parse(&raw_payload) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "Error decoding JSON from Pub/Sub message");
                return EventOutcome::Malformed {
                    reason: e.to_string(),
                };
            }
        };

        if !payload.is_compute_instance() {
            let asset_type = payload.asset_type();
            info!(asset_type = ?asset_type, "Skipping asset type");
            return EventOutcome::Skipped { asset_type };
        }

        let event = match payload.into_event() {
            Ok(event) => event,
            Err(e) => {
                error!(error = %e, "Error reading instance fields from Pub/Sub message");
                return EventOutcome::Malformed {
                    reason: e.to_string(),
                };
            }
        };

        let details = extract_vm_details(&event);
        let compliance = self.policy.check(&details.labels);
        let vm_name = details.vm_name.clone();
        debug!(
            vm_name = ?vm_name,
            status = %compliance.status,
            missing = ?compliance.missing,
            "Evaluated label compliance"
        );

        let record = OutputRecord::assemble(details, compliance, ingested_at, raw_payload);

        match self.sink.insert_rows(&self.table, &[record]).await {
            Ok(errors) if errors.is_empty() => {
                info!(
                    vm_name = vm_name.as_deref().unwrap_or(UNKNOWN_VM),
                    table = %self.table,
                    "Successfully inserted row"
                );
                EventOutcome::Inserted { vm_name }
            }
            Ok(errors) => {
                error!(
                    vm_name = vm_name.as_deref().unwrap_or(UNKNOWN_VM),
                    table = %self.table,
                    errors = ?errors,
                    "Errors inserting row"
                );
                EventOutcome::WriteRejected { vm_name, errors }
            }
            Err(e) => {
                error!(
                    vm_name = vm_name.as_deref().unwrap_or(UNKNOWN_VM),
                    table = %self.table,
                    error = %e,
                    "An unexpected error occurred"
                );
                EventOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

impl std::fmt::Debug for AssetEventHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetEventHandler")
            .field("policy", &self.policy)
            .field("table", &self.table)
            .field("sink", &self.sink.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::ComplianceStatus;
    use crate::envelope::encode_push_body;
    use crate::sink::{MockRowSink, SinkError};
    use chrono::TimeZone;
    use serde_json::json;

    fn handler(sink: Arc<MockRowSink>) -> AssetEventHandler {
        AssetEventHandler::new(
            LabelPolicy::default(),
            TableId::new("acme", "activities", "resources"),
            sink,
        )
    }

    fn instance_payload(labels: serde_json::Value) -> String {
        json!({
            "name": "a/b/projects/acme/zones/us-east1-b/instances/db-1",
            "assetType": "compute.googleapis.com/Instance",
            "resource": {"data": {
                "name": "db-1",
                "id": 991,
                "machineType": "zones/us-east1-b/machineTypes/n2-standard-4",
                "zone": "projects/acme/zones/us-east1-b",
                "labels": labels,
                "networkInterfaces": [{"networkIP": "10.1.2.3"}]
            }}
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_non_compliant_instance_is_inserted() {
        let sink = Arc::new(MockRowSink::new());
        let handler = handler(sink.clone());
        let payload = instance_payload(json!({"owner": "alice"}));
        let now = Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap();

        let outcome = handler
            .handle_at(&encode_push_body(&payload, "m-1"), now)
            .await;

        assert_eq!(
            outcome,
            EventOutcome::Inserted {
                vm_name: Some("db-1".to_string())
            }
        );
        let rows = sink.rows_with_tables().await;
        assert_eq!(rows.len(), 1);
        let (table, row) = &rows[0];
        assert_eq!(table.to_string(), "acme.activities.resources");
        assert_eq!(row.compliance_status, ComplianceStatus::NonCompliant);
        assert_eq!(
            row.compliance_details,
            "Missing required labels: cost-center, environment"
        );
        assert_eq!(row.project_id.as_deref(), Some("acme"));
        assert_eq!(row.vm_id, "991");
        assert_eq!(row.machine_type.as_deref(), Some("n2-standard-4"));
        assert_eq!(row.zone.as_deref(), Some("us-east1-b"));
        assert_eq!(row.network_ip.as_deref(), Some("10.1.2.3"));
        assert_eq!(row.labels.as_deref(), Some(r#"{"owner":"alice"}"#));
        assert_eq!(row.ingestion_timestamp, now);
        assert_eq!(row.raw_payload, payload);
    }

    #[tokio::test]
    async fn test_compliant_instance() {
        let sink = Arc::new(MockRowSink::new());
        let payload = instance_payload(json!({
            "owner": "alice", "cost-center": "42", "environment": "prod"
        }));

        let outcome = handler(sink.clone())
            .handle(&encode_push_body(&payload, "m-2"))
            .await;

        assert!(outcome.is_inserted());
        let rows = sink.rows().await;
        assert_eq!(rows[0].compliance_status, ComplianceStatus::Compliant);
        assert_eq!(rows[0].compliance_details, "All required labels are present.");
    }

    #[tokio::test]
    async fn test_other_asset_types_are_skipped() {
        let sink = Arc::new(MockRowSink::new());
        let payload = json!({"name": "//storage.googleapis.com/b", "assetType": "storage.googleapis.com/Bucket"});

        let outcome = handler(sink.clone())
            .handle(&encode_push_body(&payload.to_string(), "m-3"))
            .await;

        assert_eq!(
            outcome,
            EventOutcome::Skipped {
                asset_type: Some("storage.googleapis.com/Bucket".to_string())
            }
        );
        assert_eq!(sink.call_count(), 0);
    }

    #[tokio::test]
    async fn test_other_asset_types_with_unexpected_fields_are_skipped() {
        let sink = Arc::new(MockRowSink::new());
        let handler = handler(sink.clone());

        let payloads = [
            json!({"assetType": "storage.googleapis.com/Bucket", "resource": {"data": {"name": 42}}}),
            json!({"assetType": "compute.googleapis.com/Disk", "resource": {"data": {"zone": {}}}}),
            json!({"assetType": "compute.googleapis.com/Network", "resource": {"data": {"networkInterfaces": {}}}}),
            json!({"assetType": "pubsub.googleapis.com/Topic", "resource": {"data": "opaque"}}),
        ];
        for payload in payloads {
            let outcome = handler
                .handle(&encode_push_body(&payload.to_string(), "m-3b"))
                .await;
            assert_eq!(outcome.label(), "skipped", "payload {}", payload);
        }
        assert_eq!(sink.call_count(), 0);
    }

    #[tokio::test]
    async fn test_instance_with_mistyped_fields_is_malformed() {
        let sink = Arc::new(MockRowSink::new());
        let payload = json!({
            "assetType": "compute.googleapis.com/Instance",
            "resource": {"data": {"name": 42}}
        });

        let outcome = handler(sink.clone())
            .handle(&encode_push_body(&payload.to_string(), "m-3c"))
            .await;

        assert_eq!(outcome.label(), "malformed");
        assert_eq!(sink.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_asset_type_is_skipped() {
        let sink = Arc::new(MockRowSink::new());
        let outcome = handler(sink.clone())
            .handle(&encode_push_body("{}", "m-4"))
            .await;

        assert_eq!(outcome, EventOutcome::Skipped { asset_type: None });
        assert_eq!(sink.call_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_payloads_produce_no_rows() {
        let sink = Arc::new(MockRowSink::new());
        let handler = handler(sink.clone());

        let bodies: Vec<Vec<u8>> = vec![
            b"garbage".to_vec(),
            br#"{"message": {}}"#.to_vec(),
            br#"{"message": {"data": "***"}}"#.to_vec(),
            encode_push_body("{\"assetType\": ", "m-5"),
        ];
        for body in bodies {
            let outcome = handler.handle(&body).await;
            assert_eq!(outcome.label(), "malformed");
        }
        assert_eq!(sink.call_count(), 0);
    }

    #[tokio::test]
    async fn test_reported_row_errors_are_not_retried() {
        let sink = Arc::new(MockRowSink::new());
        sink.set_row_errors(vec![RowInsertError::new(0, "invalid", "no such field")])
            .await;

        let outcome = handler(sink.clone())
            .handle(&encode_push_body(&instance_payload(json!({})), "m-6"))
            .await;

        match &outcome {
            EventOutcome::WriteRejected { vm_name, errors } => {
                assert_eq!(vm_name.as_deref(), Some("db-1"));
                assert_eq!(errors.len(), 1);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(sink.call_count(), 1);
        assert_eq!(
            outcome.detail(),
            "Row rejected for VM db-1: row 0: invalid: no such field"
        );
    }

    #[tokio::test]
    async fn test_sink_failure_is_absorbed() {
        let sink = Arc::new(MockRowSink::new());
        sink.set_failure(SinkError::TableNotFound("acme.activities.resources".to_string()))
            .await;

        let outcome = handler(sink.clone())
            .handle(&encode_push_body(&instance_payload(json!({})), "m-7"))
            .await;

        assert_eq!(
            outcome,
            EventOutcome::Failed {
                reason: "Table not found: acme.activities.resources".to_string()
            }
        );
        assert_eq!(sink.call_count(), 1);
        assert_eq!(sink.row_count().await, 0);
    }

    #[tokio::test]
    async fn test_labels_that_are_not_a_mapping() {
        let sink = Arc::new(MockRowSink::new());
        let outcome = handler(sink.clone())
            .handle(&encode_push_body(&instance_payload(json!(["owner"])), "m-8"))
            .await;

        assert!(outcome.is_inserted());
        let rows = sink.rows().await;
        assert!(rows[0].labels.is_none());
        assert_eq!(
            rows[0].compliance_details,
            "Missing required labels: owner, cost-center, environment"
        );
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = EventOutcome::Skipped {
            asset_type: Some("x".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"outcome": "skipped", "asset_type": "x"})
        );
        assert_eq!(outcome.detail(), "Skipped asset type: x");
    }
}
