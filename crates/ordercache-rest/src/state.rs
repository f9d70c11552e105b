//! Application state for Axum handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use ordercache_core::HealthCheck;
use ordercache_service::OrderService;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub order_service: Arc<dyn OrderService>,
    /// Dependencies consulted by `/ready`.
    pub health_checks: Vec<Arc<dyn HealthCheck>>,
    /// Set when the Prometheus recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(order_service: Arc<dyn OrderService>) -> Self {
        Self {
            order_service,
            health_checks: Vec::new(),
            metrics: None,
        }
    }

    /// Adds a dependency to the readiness probe.
    #[must_use]
    pub fn with_health_check(mut self, check: Arc<dyn HealthCheck>) -> Self {
        self.health_checks.push(check);
        self
    }

    /// Exposes the given recorder on the metrics endpoint.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
