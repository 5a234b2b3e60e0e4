//! Metrics for Label Warden.
//!
//! Counters are recorded through the `metrics` facade. The Prometheus
//! recorder is installed once by the server binary; without a recorder every
//! call is a no-op.

use lw_core::EventOutcome;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Deliveries received on the push endpoint.
pub const EVENTS_RECEIVED: &str = "lw_events_received_total";
/// Deliveries handled, labelled by outcome.
pub const EVENTS_PROCESSED: &str = "lw_events_processed_total";
/// Rows accepted by the sink.
pub const ROWS_INSERTED: &str = "lw_rows_inserted_total";
/// Time spent handling one delivery.
pub const EVENT_DURATION: &str = "lw_event_duration_seconds";

/// Installs the global Prometheus recorder and returns its render handle.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    EventMetrics::register_metrics();
    Ok(handle)
}

/// Records per-event counters.
#[derive(Debug, Clone, Default)]
pub struct EventMetrics;

impl EventMetrics {
    /// Creates a recorder front-end and registers metric descriptions.
    pub fn new() -> Self {
        Self::register_metrics();
        Self
    }

    fn register_metrics() {
        describe_counter!(EVENTS_RECEIVED, "Total number of push deliveries received");
        describe_counter!(
            EVENTS_PROCESSED,
            "Total number of deliveries handled, by outcome"
        );
        describe_counter!(ROWS_INSERTED, "Total number of rows accepted by the sink");
        describe_histogram!(EVENT_DURATION, "Time spent handling one delivery");
    }

    /// Records a received delivery.
    pub fn record_received(&self) {
        counter!(EVENTS_RECEIVED).increment(1);
    }

    /// Records the outcome of a delivery and how long it took.
    pub fn record_outcome(&self, outcome: &EventOutcome, elapsed: Duration) {
        counter!(EVENTS_PROCESSED, "outcome" => outcome.label()).increment(1);
        if outcome.is_inserted() {
            counter!(ROWS_INSERTED).increment(1);
        }
        histogram!(EVENT_DURATION, "outcome" => outcome.label()).record(elapsed.as_secs_f64());
    }
}
