//! Prometheus metrics
//!
//! Counters and histograms are recorded through the `metrics` facade across
//! all crates; this module installs the exporter and serves the text format.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;
use crate::ServerError;

/// Install the global Prometheus recorder
pub fn init_metrics() -> Result<PrometheusHandle, ServerError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Internal(format!("metrics recorder: {}", e)))?;

    metrics::describe_counter!("chat_agent_messages_total", "Inbound messages processed");
    metrics::describe_counter!("chat_agent_replies_total", "Responses emitted, by kind");
    metrics::describe_counter!("chat_agent_triggers_fired_total", "Trigger file deliveries");
    metrics::describe_counter!("chat_agent_ai_failures_total", "Failed AI consultations");
    metrics::describe_histogram!("chat_agent_ai_latency_seconds", "AI completion latency");
    metrics::describe_counter!("chat_agent_webhook_events_total", "Webhook events, by kind");
    metrics::describe_gauge!("chat_agent_connection_open", "1 while the session is open");

    Ok(handle)
}

/// Count a webhook event
pub fn record_webhook(kind: &'static str) {
    metrics::counter!("chat_agent_webhook_events_total", "kind" => kind).increment(1);
}

/// Prometheus scrape endpoint
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics disabled".to_string()),
    }
}
