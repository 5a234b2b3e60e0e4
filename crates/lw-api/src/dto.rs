//! Request and response bodies.

use lw_core::EventOutcome;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Acknowledgement returned for every push delivery.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventResponse {
    /// One of `inserted`, `skipped`, `malformed`, `write_rejected`, `failed`.
    pub outcome: String,
    /// Human-readable description of the outcome.
    pub detail: String,
}

impl From<&EventOutcome> for EventResponse {
    fn from(outcome: &EventOutcome) -> Self {
        Self {
            outcome: outcome.label().to_string(),
            detail: outcome.detail(),
        }
    }
}

/// Liveness and configuration summary.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Destination table as `project.dataset.table`.
    pub table: String,
    pub sink: String,
    pub required_labels: Vec<String>,
}

/// Readiness of the sink.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadinessResponse {
    pub ready: bool,
    /// Sink health as reported by its connector, or `not_checked`.
    pub sink_status: String,
}
