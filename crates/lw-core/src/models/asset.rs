//! Asset change event data model.
//!
//! These types mirror the subset of a Cloud Asset Inventory change
//! notification that Label Warden reads. Every nested attribute is optional:
//! an absent key becomes `None` (or an empty collection) instead of a
//! deserialization failure.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Asset type of a Compute Engine virtual machine.
pub const COMPUTE_INSTANCE_ASSET_TYPE: &str = "compute.googleapis.com/Instance";

/// Inbound asset change notification.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssetChangeEvent {
    /// Full resource name, e.g.
    /// `//compute.googleapis.com/projects/p/zones/z/instances/i`.
    #[serde(default)]
    pub name: Option<String>,
    /// Asset type tag, e.g. `compute.googleapis.com/Instance`.
    #[serde(default)]
    pub asset_type: Option<String>,
    /// Resource snapshot attached to the notification.
    #[serde(default)]
    pub resource: Option<AssetResource>,
}

impl AssetChangeEvent {
    /// Returns true when the event describes a Compute Engine instance.
    pub fn is_compute_instance(&self) -> bool {
        self.asset_type.as_deref() == Some(COMPUTE_INSTANCE_ASSET_TYPE)
    }

    /// Returns the nested resource data block, if present.
    pub fn resource_data(&self) -> Option<&ResourceData> {
        self.resource.as_ref().and_then(|r| r.data.as_ref())
    }
}

/// Resource wrapper carrying the provider-specific data block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AssetResource {
    #[serde(default)]
    pub data: Option<ResourceData>,
}

/// Instance attributes nested under `resource.data`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceData {
    /// Display name of the instance.
    #[serde(default)]
    pub name: Option<String>,
    /// Numeric or string identifier. Kept as raw JSON because the API
    /// emits it as a string while older feeds used numbers.
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    /// Creation timestamp as reported by the API (RFC 3339 text).
    #[serde(default)]
    pub creation_timestamp: Option<String>,
    /// Machine type reference path.
    #[serde(default)]
    pub machine_type: Option<String>,
    /// Zone reference path.
    #[serde(default)]
    pub zone: Option<String>,
    /// Resource labels. A non-object value is read as an empty mapping.
    #[serde(default, deserialize_with = "deserialize_labels")]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterface>,
}

/// A single network interface entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NetworkInterface {
    /// Primary internal IP address.
    #[serde(rename = "networkIP", default)]
    pub network_ip: Option<String>,
    /// Network reference path.
    #[serde(default)]
    pub network: Option<String>,
}

/// Reads a label mapping leniently.
///
/// String values are taken as-is; other scalar values keep their JSON text.
/// Anything that is not a JSON object yields an empty mapping.
fn deserialize_labels<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(labels_from_value(value))
}

fn labels_from_value(value: serde_json::Value) -> HashMap<String, String> {
    match value {
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect(),
        // Deliberately dropped rather than kept as JSON text, so the labels
        // column only ever holds an object.
        _ => HashMap::new(),
    }
}
