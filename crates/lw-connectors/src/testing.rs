//! Helpers for connector tests.

use crate::secret::SecretToken;
use crate::traits::{AuthConfig, ConnectorConfig, ConnectorHealth, ConnectorResult};
use chrono::{TimeZone, Utc};
use lw_core::{LabelPolicy, OutputRecord, VmDetails};
use std::collections::HashMap;

/// Creates a test connector config with no authentication.
pub fn test_connector_config(name: &str, base_url: &str) -> ConnectorConfig {
    ConnectorConfig {
        name: name.to_string(),
        base_url: base_url.to_string(),
        auth: AuthConfig::None,
        timeout_secs: 10,
        verify_tls: true,
        headers: HashMap::new(),
    }
}

/// Creates a test connector config with bearer token auth.
pub fn test_connector_config_with_bearer(
    name: &str,
    base_url: &str,
    token: &str,
) -> ConnectorConfig {
    ConnectorConfig {
        auth: AuthConfig::BearerToken {
            token: SecretToken::new(token),
        },
        ..test_connector_config(name, base_url)
    }
}

/// Builds an output row for an instance with the given labels.
pub fn sample_record(vm_name: &str, labels: &[(&str, &str)]) -> OutputRecord {
    let details = VmDetails {
        asset_full_name: Some(format!("a/b/projects/acme/instances/{}", vm_name)),
        asset_type: Some(lw_core::models::COMPUTE_INSTANCE_ASSET_TYPE.to_string()),
        vm_name: Some(vm_name.to_string()),
        vm_id: "1001".to_string(),
        project_id: Some("acme".to_string()),
        labels: labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        ..Default::default()
    };
    let compliance = LabelPolicy::default().check(&details.labels);
    let ingested_at = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);
    OutputRecord::assemble(details, compliance, ingested_at, "{}".to_string())
}

/// Asserts that a connector health check returns healthy.
pub fn assert_healthy(result: &ConnectorResult<ConnectorHealth>) {
    match result {
        Ok(ConnectorHealth::Healthy) => {}
        other => panic!("Expected Healthy, got {:?}", other),
    }
}

/// Asserts that a connector health check returns unhealthy.
pub fn assert_unhealthy(result: &ConnectorResult<ConnectorHealth>) {
    match result {
        Ok(ConnectorHealth::Unhealthy(_)) => {}
        other => panic!("Expected Unhealthy, got {:?}", other),
    }
}
