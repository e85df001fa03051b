//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use chat_agent_agent::Orchestrator;
use chat_agent_config::Settings;

use crate::lifecycle::ConnectionLifecycle;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub orchestrator: Arc<Orchestrator>,
    pub lifecycle: Arc<ConnectionLifecycle>,
    /// Prometheus handle, absent when metrics are disabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        config: Settings,
        orchestrator: Orchestrator,
        lifecycle: Arc<ConnectionLifecycle>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            lifecycle,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
