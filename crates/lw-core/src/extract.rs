//! Field extraction from asset change events.
//!
//! Extraction is total: every lookup yields an optional value, so a sparse
//! event produces a sparse [`VmDetails`] rather than an error.

use std::collections::HashMap;

use crate::models::AssetChangeEvent;

/// Flattened instance attributes pulled out of an [`AssetChangeEvent`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmDetails {
    /// Full resource name of the asset.
    pub asset_full_name: Option<String>,
    /// Asset type tag.
    pub asset_type: Option<String>,
    /// Instance display name.
    pub vm_name: Option<String>,
    /// Instance identifier rendered as text; empty when absent.
    pub vm_id: String,
    /// Creation timestamp as reported by the source.
    pub creation_timestamp: Option<String>,
    /// Project id parsed from the asset name.
    pub project_id: Option<String>,
    /// Machine type short name (last path segment).
    pub machine_type: Option<String>,
    /// Zone short name (last path segment).
    pub zone: Option<String>,
    /// Resource labels.
    pub labels: HashMap<String, String>,
    /// IP of the first network interface.
    pub network_ip: Option<String>,
}

/// Extracts the instance attributes from an event.
pub fn extract_vm_details(event: &AssetChangeEvent) -> VmDetails {
    let data = event.resource_data();

    let asset_full_name = event.name.clone();
    let project_id = asset_full_name.as_deref().and_then(project_id_from_asset_name);

    VmDetails {
        asset_type: event.asset_type.clone(),
        vm_name: data.and_then(|d| d.name.clone()),
        vm_id: data
            .and_then(|d| d.id.as_ref())
            .map(id_to_string)
            .unwrap_or_default(),
        creation_timestamp: data.and_then(|d| d.creation_timestamp.clone()),
        project_id,
        machine_type: data
            .and_then(|d| d.machine_type.as_deref())
            .and_then(last_segment),
        zone: data.and_then(|d| d.zone.as_deref()).and_then(last_segment),
        labels: data.map(|d| d.labels.clone()).unwrap_or_default(),
        network_ip: data
            .and_then(|d| d.network_interfaces.first())
            .and_then(|nic| nic.network_ip.clone()),
        asset_full_name,
    }
}

/// Returns the project id embedded in a full asset name.
///
/// The name is split on `/`; the project id is segment 3 when there are more
/// than three segments and segment 2 is `projects`. For
/// `//compute.googleapis.com/projects/p/...` the segments are
/// `["", "", "compute.googleapis.com", "projects", "p", ...]`, so only names
/// of the form `a/b/projects/p` match.
pub fn project_id_from_asset_name(name: &str) -> Option<String> {
    let parts: Vec<&str> = name.split('/').collect();
    if parts.len() > 3 && parts[2] == "projects" {
        Some(parts[3].to_string())
    } else {
        None
    }
}

/// Returns the final `/` segment of a non-empty reference path.
pub fn last_segment(path: &str) -> Option<String> {
    if path.is_empty() {
        return None;
    }
    path.rsplit('/').next().map(str::to_string)
}

fn id_to_string(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        // Deliberately empty rather than a placeholder word like "None".
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
