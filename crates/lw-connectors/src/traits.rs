//! Connector trait and shared configuration types.

use crate::secret::SecretToken;
use async_trait::async_trait;
use lw_core::{SinkError, TableId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Metadata server endpoint that issues tokens for the attached service account.
pub const GCP_METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Errors that can occur in connectors.
#[derive(Error, Debug, Clone)]
pub enum ConnectorError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl ConnectorError {
    /// Converts the error into a sink error for a call against `table`.
    pub fn into_sink_error(self, table: &TableId) -> SinkError {
        match self {
            ConnectorError::NotFound(_) => SinkError::TableNotFound(table.to_string()),
            ConnectorError::AuthenticationFailed(e) | ConnectorError::AuthorizationDenied(e) => {
                SinkError::Authentication(e)
            }
            ConnectorError::ConnectionFailed(e) | ConnectorError::Timeout(e) => {
                SinkError::Connection(e)
            }
            ConnectorError::InvalidResponse(e) => SinkError::InvalidResponse(e),
            ConnectorError::RequestFailed(e) | ConnectorError::ConfigError(e) => {
                SinkError::Request(e)
            }
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Health status of a connector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorHealth {
    Healthy,
    Degraded(String),
    Unhealthy(String),
    Unknown,
}

/// Configuration for a connector.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorConfig {
    /// Connector name.
    pub name: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Whether to verify TLS certificates.
    pub verify_tls: bool,
    /// Additional headers to include.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication.
    None,
    /// Static bearer token.
    BearerToken { token: SecretToken },
    /// Token fetched from the GCP metadata server and cached until expiry.
    GcpMetadata {
        #[serde(default = "default_metadata_token_url")]
        token_url: String,
    },
}

impl AuthConfig {
    /// Metadata server authentication against the default endpoint.
    pub fn gcp_metadata() -> Self {
        AuthConfig::GcpMetadata {
            token_url: default_metadata_token_url(),
        }
    }
}

fn default_metadata_token_url() -> String {
    GCP_METADATA_TOKEN_URL.to_string()
}

/// Base trait for connectors.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Returns the connector name.
    fn name(&self) -> &str;

    /// Returns the connector type (e.g., "warehouse").
    fn connector_type(&self) -> &str;

    /// Checks the health of the connector.
    async fn health_check(&self) -> ConnectorResult<ConnectorHealth>;
}
