//! Handler configuration.
//!
//! Values are read once from the process environment at start-up and held
//! for the lifetime of the process.

use thiserror::Error;

use crate::compliance::LabelPolicy;
use crate::models::TableId;

/// Default dataset name.
pub const DEFAULT_DATASET: &str = "activities";

/// Default table name.
pub const DEFAULT_TABLE: &str = "resources";

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(String),

    #[error("Invalid configuration value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Settings that define where rows go and which labels are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Project that owns the destination table.
    pub project: String,
    /// Dataset name.
    pub dataset: String,
    /// Table name.
    pub table: String,
    /// Required-label policy.
    pub policy: LabelPolicy,
}

impl HandlerConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// | key | default |
    /// |-----|---------|
    /// | `GCP_PROJECT`, then `GOOGLE_CLOUD_PROJECT` | required |
    /// | `BQ_DATASET` | `activities` |
    /// | `BQ_TABLE` | `resources` |
    /// | `REQUIRED_LABELS_JSON` | `["owner","cost-center","environment"]` |
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let project = non_empty("GCP_PROJECT")
            .or_else(|| non_empty("GOOGLE_CLOUD_PROJECT"))
            .ok_or_else(|| ConfigError::Missing("GCP_PROJECT".to_string()))?;
        let dataset = non_empty("BQ_DATASET").unwrap_or_else(|| DEFAULT_DATASET.to_string());
        let table = non_empty("BQ_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string());

        for (key, value) in [("BQ_DATASET", &dataset), ("BQ_TABLE", &table)] {
            if value.contains('.') {
                return Err(ConfigError::Invalid {
                    key: key.to_string(),
                    message: format!("'{}' must not contain '.'", value),
                });
            }
        }

        let policy = LabelPolicy::from_config_value(lookup("REQUIRED_LABELS_JSON").as_deref());

        Ok(Self {
            project,
            dataset,
            table,
            policy,
        })
    }

    /// Returns the destination table address.
    pub fn table_id(&self) -> TableId {
        TableId::new(&self.project, &self.dataset, &self.table)
    }
}
