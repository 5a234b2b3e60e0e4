//! BigQuery streaming-insert sink.
//!
//! Rows are appended through the BigQuery REST API v2. Each call resolves
//! the destination table first and then streams the rows with `insertAll`.
//! Neither request is retried.

use crate::http::HttpClient;
use crate::traits::{Connector, ConnectorConfig, ConnectorError, ConnectorHealth, ConnectorResult};
use async_trait::async_trait;
use lw_core::{OutputRecord, RowErrorDetail, RowInsertError, RowSink, SinkError, TableId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Public BigQuery REST endpoint.
pub const DEFAULT_BIGQUERY_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// BigQuery sink configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BigQueryConfig {
    /// Base connector configuration.
    #[serde(flatten)]
    pub connector: ConnectorConfig,
    /// Project whose datasets are listed by the health check.
    pub project: String,
}

/// Row sink backed by BigQuery `tabledata.insertAll`.
pub struct BigQuerySink {
    config: BigQueryConfig,
    client: HttpClient,
}

impl BigQuerySink {
    /// Creates a new BigQuery sink.
    pub fn new(config: BigQueryConfig) -> ConnectorResult<Self> {
        let client = HttpClient::new(config.connector.clone())?;
        info!(
            base_url = %config.connector.base_url,
            project = %config.project,
            "BigQuery sink initialized"
        );
        Ok(Self { config, client })
    }

    fn table_path(table: &TableId) -> String {
        format!(
            "/projects/{}/datasets/{}/tables/{}",
            table.project, table.dataset, table.table
        )
    }

    /// Fetches table metadata, failing with `NotFound` if the table is absent.
    #[instrument(skip(self, table), fields(table = %table))]
    pub async fn get_table(&self, table: &TableId) -> ConnectorResult<TableResource> {
        let resource: TableResource = self.client.get_json(&Self::table_path(table)).await?;
        debug!(
            fields = resource.schema.as_ref().map(|s| s.fields.len()).unwrap_or(0),
            "Resolved table"
        );
        Ok(resource)
    }

    /// Streams rows into a table and returns the per-row rejections.
    #[instrument(skip(self, table, rows), fields(table = %table, rows = rows.len()))]
    pub async fn insert_all(
        &self,
        table: &TableId,
        rows: &[OutputRecord],
    ) -> ConnectorResult<Vec<RowInsertError>> {
        let request = InsertAllRequest::new(rows)?;
        let path = format!("{}/insertAll", Self::table_path(table));
        let response: InsertAllResponse = self.client.post_json(&path, &request).await?;
        Ok(response.into_row_errors())
    }
}

#[async_trait]
impl Connector for BigQuerySink {
    fn name(&self) -> &str {
        &self.config.connector.name
    }

    fn connector_type(&self) -> &str {
        "warehouse"
    }

    async fn health_check(&self) -> ConnectorResult<ConnectorHealth> {
        let path = format!("/projects/{}/datasets?maxResults=1", self.config.project);
        match self.client.get(&path).await {
            Ok(_) => Ok(ConnectorHealth::Healthy),
            Err(ConnectorError::AuthenticationFailed(_)) => Ok(ConnectorHealth::Unhealthy(
                "Authentication failed".to_string(),
            )),
            Err(ConnectorError::AuthorizationDenied(_)) => Ok(ConnectorHealth::Unhealthy(
                "Authorization denied".to_string(),
            )),
            Err(ConnectorError::ConnectionFailed(e)) => Ok(ConnectorHealth::Unhealthy(format!(
                "Connection failed: {}",
                e
            ))),
            Err(e) => Ok(ConnectorHealth::Degraded(e.to_string())),
        }
    }
}

#[async_trait]
impl RowSink for BigQuerySink {
    async fn insert_rows(
        &self,
        table: &TableId,
        rows: &[OutputRecord],
    ) -> Result<Vec<RowInsertError>, SinkError> {
        self.get_table(table)
            .await
            .map_err(|e| e.into_sink_error(table))?;
        self.insert_all(table, rows)
            .await
            .map_err(|e| e.into_sink_error(table))
    }

    fn name(&self) -> &str {
        &self.config.connector.name
    }
}

// BigQuery API types

/// Subset of the `tables.get` resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableResource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub schema: Option<TableSchema>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<TableField>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableField {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllRequest {
    kind: &'static str,
    skip_invalid_rows: bool,
    ignore_unknown_values: bool,
    rows: Vec<InsertRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertRow {
    insert_id: String,
    json: serde_json::Value,
}

impl InsertAllRequest {
    fn new(rows: &[OutputRecord]) -> ConnectorResult<Self> {
        let rows = rows
            .iter()
            .map(|row| {
                serde_json::to_value(row)
                    .map(|json| InsertRow {
                        insert_id: Uuid::new_v4().to_string(),
                        json,
                    })
                    .map_err(|e| ConnectorError::RequestFailed(e.to_string()))
            })
            .collect::<ConnectorResult<Vec<_>>>()?;

        Ok(Self {
            kind: "bigquery#tableDataInsertAllRequest",
            skip_invalid_rows: false,
            ignore_unknown_values: false,
            rows,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<InsertErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct InsertErrorEntry {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    errors: Vec<RowErrorDetail>,
}

impl InsertAllResponse {
    fn into_row_errors(self) -> Vec<RowInsertError> {
        self.insert_errors
            .into_iter()
            .map(|entry| RowInsertError {
                index: entry.index,
                errors: entry.errors,
            })
            .collect()
    }
}
