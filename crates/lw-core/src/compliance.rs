//! Required-label policy.
//!
//! A [`LabelPolicy`] holds the ordered list of label keys every instance must
//! carry. It is built once at start-up and only read afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Label keys required when no usable configuration is supplied.
pub const DEFAULT_REQUIRED_LABELS: [&str; 3] = ["owner", "cost-center", "environment"];

/// Detail text for a resource that carries every required label.
pub const ALL_LABELS_PRESENT: &str = "All required labels are present.";

/// Compliance classification of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
}

impl ComplianceStatus {
    /// Returns the stored column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Compliant => "COMPLIANT",
            ComplianceStatus::NonCompliant => "NON_COMPLIANT",
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of checking a label set against the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplianceResult {
    /// Overall status.
    pub status: ComplianceStatus,
    /// Human-readable explanation.
    pub details: String,
    /// Missing keys, in policy order.
    pub missing: Vec<String>,
}

impl ComplianceResult {
    fn from_missing(missing: Vec<String>) -> Self {
        if missing.is_empty() {
            Self {
                status: ComplianceStatus::Compliant,
                details: ALL_LABELS_PRESENT.to_string(),
                missing,
            }
        } else {
            Self {
                status: ComplianceStatus::NonCompliant,
                details: format!("Missing required labels: {}", missing.join(", ")),
                missing,
            }
        }
    }

    /// Returns true when no required label is missing.
    pub fn is_compliant(&self) -> bool {
        self.status == ComplianceStatus::Compliant
    }
}

/// Ordered set of label keys every instance must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelPolicy {
    required_labels: Vec<String>,
}

impl Default for LabelPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_REQUIRED_LABELS.iter().map(|s| s.to_string()).collect())
    }
}

impl LabelPolicy {
    /// Creates a policy from an explicit key list.
    pub fn new(required_labels: Vec<String>) -> Self {
        Self { required_labels }
    }

    /// Builds the policy from the raw `REQUIRED_LABELS_JSON` value.
    ///
    /// The value must be a JSON array of strings. An absent value selects the
    /// defaults; a value that cannot be parsed also selects the defaults, after
    /// logging a warning.
    pub fn from_config_value(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };

        match serde_json::from_str::<Vec<String>>(raw) {
            Ok(labels) => Self::new(labels),
            Err(e) => {
                warn!(
                    value = %raw,
                    error = %e,
                    "Could not parse REQUIRED_LABELS_JSON, using default required labels"
                );
                Self::default()
            }
        }
    }

    /// Returns the required keys in configured order.
    pub fn required_labels(&self) -> &[String] {
        &self.required_labels
    }

    /// Checks a label mapping against the policy.
    pub fn check(&self, labels: &HashMap<String, String>) -> ComplianceResult {
        let missing = self
            .required_labels
            .iter()
            .filter(|key| !labels.contains_key(key.as_str()))
            .cloned()
            .collect();
        ComplianceResult::from_missing(missing)
    }
}
