//! # lw-connectors
//!
//! Outbound connectors for Label Warden.
//!
//! This crate provides the HTTP plumbing shared by connectors and the
//! BigQuery implementation of [`lw_core::RowSink`].

pub mod bigquery;
pub mod http;
pub mod secret;
pub mod testing;
pub mod traits;

pub use bigquery::{BigQueryConfig, BigQuerySink, DEFAULT_BIGQUERY_BASE_URL};
pub use http::HttpClient;
pub use secret::SecretToken;
pub use traits::{
    AuthConfig, Connector, ConnectorConfig, ConnectorError, ConnectorHealth, ConnectorResult,
    GCP_METADATA_TOKEN_URL,
};
