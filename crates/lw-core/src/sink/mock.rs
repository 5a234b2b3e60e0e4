//! In-memory row sink for tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{RowInsertError, RowSink, SinkError};
use crate::models::{OutputRecord, TableId};

/// Mock sink that keeps accepted rows in memory.
///
/// It can be primed to report row rejections or to fail outright; a primed
/// outcome applies to every call until it is cleared.
pub struct MockRowSink {
    name: String,
    rows: Arc<RwLock<Vec<(TableId, OutputRecord)>>>,
    row_errors: Arc<RwLock<Vec<RowInsertError>>>,
    failure: Arc<RwLock<Option<SinkError>>>,
    calls: AtomicU64,
}

impl MockRowSink {
    /// Creates an empty mock sink.
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            rows: Arc::new(RwLock::new(Vec::new())),
            row_errors: Arc::new(RwLock::new(Vec::new())),
            failure: Arc::new(RwLock::new(None)),
            calls: AtomicU64::new(0),
        }
    }

    /// Makes subsequent calls report `errors` and store nothing.
    pub async fn set_row_errors(&self, errors: Vec<RowInsertError>) {
        *self.row_errors.write().await = errors;
    }

    /// Makes subsequent calls fail with `error`.
    pub async fn set_failure(&self, error: SinkError) {
        *self.failure.write().await = Some(error);
    }

    /// Restores normal behaviour.
    pub async fn reset(&self) {
        self.row_errors.write().await.clear();
        *self.failure.write().await = None;
    }

    /// Returns every accepted row.
    pub async fn rows(&self) -> Vec<OutputRecord> {
        self.rows
            .read()
            .await
            .iter()
            .map(|(_, row)| row.clone())
            .collect()
    }

    /// Returns accepted rows along with the table they were written to.
    pub async fn rows_with_tables(&self) -> Vec<(TableId, OutputRecord)> {
        self.rows.read().await.clone()
    }

    /// Number of accepted rows.
    pub async fn row_count(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Number of `insert_rows` calls, including failed ones.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockRowSink {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockRowSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRowSink")
            .field("name", &self.name)
            .field("calls", &self.calls)
            .finish()
    }
}

#[async_trait]
impl RowSink for MockRowSink {
    async fn insert_rows(
        &self,
        table: &TableId,
        rows: &[OutputRecord],
    ) -> Result<Vec<RowInsertError>, SinkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.failure.read().await.clone() {
            return Err(error);
        }

        let row_errors = self.row_errors.read().await.clone();
        if !row_errors.is_empty() {
            return Ok(row_errors);
        }

        let mut stored = self.rows.write().await;
        stored.extend(rows.iter().cloned().map(|row| (table.clone(), row)));
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
