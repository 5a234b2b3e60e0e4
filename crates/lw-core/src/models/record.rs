//! Output row model.
//!
//! [`OutputRecord`] is the row appended to the inventory table. Field names
//! are the table's column names.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::compliance::{ComplianceResult, ComplianceStatus};
use crate::extract::VmDetails;

/// Three-part address of the destination table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableId {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableId {
    /// Creates a table address.
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// One row of the inventory table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputRecord {
    pub asset_full_name: Option<String>,
    pub asset_type: Option<String>,
    pub vm_name: Option<String>,
    pub vm_id: String,
    pub creation_timestamp: Option<String>,
    pub machine_type: Option<String>,
    pub zone: Option<String>,
    pub project_id: Option<String>,
    /// Label mapping as a JSON object string with sorted keys; `None` when
    /// the resource has no labels.
    pub labels: Option<String>,
    pub network_ip: Option<String>,
    pub compliance_status: ComplianceStatus,
    pub compliance_details: String,
    /// Processing time, written as RFC 3339 UTC with microseconds.
    #[serde(serialize_with = "serialize_ingestion_timestamp")]
    pub ingestion_timestamp: DateTime<Utc>,
    /// Decoded message text exactly as received.
    pub raw_payload: String,
}

impl OutputRecord {
    /// Assembles a row from the extracted fields and the policy result.
    pub fn assemble(
        details: VmDetails,
        compliance: ComplianceResult,
        ingested_at: DateTime<Utc>,
        raw_payload: String,
    ) -> Self {
        Self {
            labels: labels_column(&details.labels),
            asset_full_name: details.asset_full_name,
            asset_type: details.asset_type,
            vm_name: details.vm_name,
            vm_id: details.vm_id,
            creation_timestamp: details.creation_timestamp,
            machine_type: details.machine_type,
            zone: details.zone,
            project_id: details.project_id,
            network_ip: details.network_ip,
            compliance_status: compliance.status,
            compliance_details: compliance.details,
            ingestion_timestamp: ingested_at,
            raw_payload,
        }
    }
}

/// Renders a label mapping for storage.
pub fn labels_column(labels: &HashMap<String, String>) -> Option<String> {
    if labels.is_empty() {
        return None;
    }
    let sorted: BTreeMap<&String, &String> = labels.iter().collect();
    serde_json::to_string(&sorted).ok()
}

fn serialize_ingestion_timestamp<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Micros, true))
}
