//! Row sink abstraction.
//!
//! The handler appends rows through the [`RowSink`] trait so the storage
//! client can be swapped for [`MockRowSink`] in tests. A sink call is made
//! once per event; implementations must not retry.
//!
//! Two failure shapes are distinguished:
//!
//! - `Ok(errors)` with a non-empty list: the store accepted the request but
//!   rejected one or more rows.
//! - `Err(SinkError)`: the request itself failed.

mod mock;

pub use mock::MockRowSink;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::models::{OutputRecord, TableId};

/// Errors that prevent a row append from completing.
#[derive(Error, Debug, Clone)]
pub enum SinkError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// One problem reported for a rejected row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowErrorDetail {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Rejection of a single row, keyed by its position in the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowInsertError {
    pub index: usize,
    pub errors: Vec<RowErrorDetail>,
}

impl RowInsertError {
    /// Creates a rejection with a single reason and message.
    pub fn new(index: usize, reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            index,
            errors: vec![RowErrorDetail {
                reason: Some(reason.into()),
                location: None,
                message: Some(message.into()),
            }],
        }
    }
}

impl fmt::Display for RowInsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}:", self.index)?;
        for (i, detail) in self.errors.iter().enumerate() {
            let sep = if i == 0 { " " } else { "; " };
            write!(
                f,
                "{}{}: {}",
                sep,
                detail.reason.as_deref().unwrap_or("unknown"),
                detail.message.as_deref().unwrap_or("")
            )?;
        }
        Ok(())
    }
}

/// Append-only destination for output rows.
#[async_trait]
pub trait RowSink: Send + Sync {
    /// Appends `rows` to `table`.
    ///
    /// Returns the per-row rejections reported by the store; an empty list
    /// means every row was accepted.
    async fn insert_rows(
        &self,
        table: &TableId,
        rows: &[OutputRecord],
    ) -> Result<Vec<RowInsertError>, SinkError>;

    /// Name of the sink, for logging.
    fn name(&self) -> &str;
}
