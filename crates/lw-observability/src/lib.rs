//! # lw-observability
//!
//! Logging and metrics infrastructure for Label Warden.
//!
//! Logs go through `tracing` with either a human-readable or a JSON
//! formatter. Counters are recorded with the `metrics` facade and exported
//! in Prometheus text format.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, init_logging_with_config, LoggingConfig};
pub use metrics::{install_prometheus_recorder, EventMetrics};
