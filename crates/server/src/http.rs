//! HTTP Endpoints
//!
//! Webhooks the messaging gateway posts into, plus health and metrics.

use std::time::Duration;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use chat_agent_core::{CallEvent, InboundEvent};

use crate::lifecycle::ConnectionUpdate;
use crate::metrics::{metrics_handler, record_webhook};
use crate::state::AppState;
use crate::ServerError;

/// Webhook handlers only enqueue work; this bounds request handling itself
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook/messages", post(message_webhook))
        .route("/webhook/calls", post(call_webhook))
        .route("/webhook/connection", post(connection_webhook))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}

/// Batch of message events as delivered by the gateway
#[derive(Debug, Deserialize)]
struct MessageBatch {
    #[serde(default = "default_batch_type", rename = "type")]
    batch_type: String,
    #[serde(default)]
    messages: Vec<InboundEvent>,
}

fn default_batch_type() -> String {
    "notify".to_string()
}

/// Accept new messages, dispatching each on its own task
async fn message_webhook(
    State(state): State<AppState>,
    Json(batch): Json<MessageBatch>,
) -> (StatusCode, Json<serde_json::Value>) {
    record_webhook("messages");

    if batch.batch_type != "notify" {
        tracing::debug!(
            batch_type = %batch.batch_type,
            count = batch.messages.len(),
            "Non-live message batch ignored"
        );
        return (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "accepted": 0 })),
        );
    }

    let accepted = batch.messages.len();
    for event in batch.messages {
        let orchestrator = state.orchestrator.clone();
        tokio::spawn(async move {
            let dispatch = orchestrator.process(&event).await;
            tracing::debug!(
                message_id = %event.id,
                final_state = %dispatch.final_state(),
                responded = dispatch.response.is_some(),
                "Message dispatched"
            );
        });
    }

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "accepted": accepted })),
    )
}

/// Accept call events; offers are rejected in the background
async fn call_webhook(
    State(state): State<AppState>,
    Json(calls): Json<Vec<CallEvent>>,
) -> (StatusCode, Json<serde_json::Value>) {
    record_webhook("calls");

    let accepted = calls.len();
    for call in calls {
        let orchestrator = state.orchestrator.clone();
        tokio::spawn(async move {
            orchestrator.handle_call(&call).await;
        });
    }

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "accepted": accepted })),
    )
}

/// Feed a connection update into the lifecycle state machine
async fn connection_webhook(
    State(state): State<AppState>,
    Json(update): Json<ConnectionUpdate>,
) -> Result<Json<serde_json::Value>, ServerError> {
    record_webhook("connection");

    let current = state.lifecycle.apply(&update).map_err(|e| {
        tracing::warn!(connection = %update.connection, error = %e, "Connection update refused");
        e
    })?;
    Ok(Json(serde_json::json!({ "connection": current.as_str() })))
}

/// Health check: healthy only while the messaging session is open
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let connection = state.lifecycle.current();
    let ctx = state.orchestrator.context();
    let store = ctx.store();

    let body = serde_json::json!({
        "status": if connection == crate::ConnectionState::Open { "healthy" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "bot": state.config.bot.name,
        "connection": connection.as_str(),
        "contacts": store.contact_count().await,
        "durable": store.is_durable(),
        "ai_enabled": ctx.ai.is_enabled(),
        "triggers": ctx.triggers.active().count(),
    });

    let status = if connection == crate::ConnectionState::Open {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

impl axum::response::IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let message = self.to_string();
        let status = StatusCode::from(self);
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
