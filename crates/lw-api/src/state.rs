//! Application state shared across handlers.

use lw_connectors::Connector;
use lw_core::AssetEventHandler;
use lw_observability::EventMetrics;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Handler for push deliveries.
    pub handler: Arc<AssetEventHandler>,
    /// Per-event counters.
    pub metrics: Arc<EventMetrics>,
    /// Connector probed by the readiness check, if any.
    pub sink_connector: Option<Arc<dyn Connector>>,
    /// Prometheus metrics handle for rendering metrics.
    pub prometheus_handle: Option<Arc<PrometheusHandle>>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(handler: AssetEventHandler) -> Self {
        Self {
            handler: Arc::new(handler),
            metrics: Arc::new(EventMetrics::new()),
            sink_connector: None,
            prometheus_handle: None,
        }
    }

    /// Sets the connector probed by `/ready`.
    pub fn with_sink_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.sink_connector = Some(connector);
        self
    }

    /// Sets the Prometheus handle used by `/metrics`.
    pub fn with_prometheus_handle(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus_handle = Some(Arc::new(handle));
        self
    }
}
