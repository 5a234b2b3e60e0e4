//! Label Warden
//!
//! Receives Cloud Asset Inventory change notifications over Pub/Sub push and
//! records Compute Engine instances with their label compliance in BigQuery.

use anyhow::{Context, Result};
use lw_api::{ApiServer, ApiServerConfig, AppState};
use lw_connectors::{
    AuthConfig, BigQueryConfig, BigQuerySink, Connector, ConnectorConfig, SecretToken,
    DEFAULT_BIGQUERY_BASE_URL,
};
use lw_core::{AssetEventHandler, HandlerConfig, RowSink};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_PORT: u16 = 8080;
const SINK_TIMEOUT_SECS: u64 = 30;

#[tokio::main]
async fn main() -> Result<()> {
    lw_observability::init_logging();

    let config = HandlerConfig::from_env().context("Failed to load configuration")?;
    info!(
        table = %config.table_id(),
        required_labels = ?config.policy.required_labels(),
        "Configuration loaded"
    );

    let prometheus = match lw_observability::install_prometheus_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Prometheus recorder not installed, /metrics disabled");
            None
        }
    };

    let lookup = |key: &str| std::env::var(key).ok();
    let sink = Arc::new(
        BigQuerySink::new(sink_config(&config.project, lookup))
            .context("Failed to create BigQuery sink")?,
    );

    let handler = AssetEventHandler::new(
        config.policy.clone(),
        config.table_id(),
        sink.clone() as Arc<dyn RowSink>,
    );
    let mut state = AppState::new(handler).with_sink_connector(sink as Arc<dyn Connector>);
    if let Some(handle) = prometheus {
        state = state.with_prometheus_handle(handle);
    }

    let port = listen_port(lookup)?;
    ApiServer::new(state, ApiServerConfig::with_port(port))
        .run()
        .await
        .context("API server failed")?;

    Ok(())
}

/// Builds the BigQuery sink configuration.
///
/// `BIGQUERY_BASE_URL` overrides the public endpoint. `BIGQUERY_ACCESS_TOKEN`
/// selects a static bearer token; otherwise tokens come from the metadata
/// server.
fn sink_config<F>(project: &str, lookup: F) -> BigQueryConfig
where
    F: Fn(&str) -> Option<String>,
{
    let base_url = lookup("BIGQUERY_BASE_URL")
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_BIGQUERY_BASE_URL.to_string());
    let token = lookup("BIGQUERY_ACCESS_TOKEN")
        .map(SecretToken::new)
        .filter(|token| !token.is_empty());
    let auth = match token {
        Some(token) => AuthConfig::BearerToken { token },
        None => AuthConfig::gcp_metadata(),
    };

    BigQueryConfig {
        connector: ConnectorConfig {
            name: "bigquery".to_string(),
            base_url,
            auth,
            timeout_secs: SINK_TIMEOUT_SECS,
            verify_tls: true,
            headers: HashMap::new(),
        },
        project: project.to_string(),
    }
}

/// Reads the listen port from `PORT`.
fn listen_port<F>(lookup: F) -> Result<u16>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup("PORT").filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Invalid PORT value '{}'", raw)),
        None => Ok(DEFAULT_PORT),
    }
}
