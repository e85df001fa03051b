//! Chat Agent Server
//!
//! Bridges the messaging gateway and the dispatcher: webhooks in, gateway
//! REST calls out, plus the connection lifecycle supervisor.

pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod metrics;
pub mod state;

pub use gateway::{GatewayClient, GatewayControl};
pub use http::create_router;
pub use lifecycle::{ConnectionLifecycle, ConnectionState, ConnectionUpdate};
pub use metrics::{init_metrics, record_webhook};
pub use state::AppState;

use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Invalid connection transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: ConnectionState,
        to: ConnectionState,
    },

    #[error("Session logged out")]
    LoggedOut,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for ServerError {
    fn from(err: reqwest::Error) -> Self {
        ServerError::Gateway(err.to_string())
    }
}

impl From<chat_agent_config::ConfigError> for ServerError {
    fn from(err: chat_agent_config::ConfigError) -> Self {
        ServerError::Config(err.to_string())
    }
}

impl From<ServerError> for chat_agent_core::Error {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::Config(msg) => chat_agent_core::Error::Config(msg),
            other => chat_agent_core::Error::Transport(other.to_string()),
        }
    }
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::Gateway(_) => axum::http::StatusCode::BAD_GATEWAY,
            ServerError::InvalidTransition { .. } => axum::http::StatusCode::CONFLICT,
            ServerError::LoggedOut => axum::http::StatusCode::GONE,
            ServerError::InvalidRequest(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::Config(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
