//! Conversational dispatcher
//!
//! Features:
//! - Keyword triggers that deliver configured files
//! - AI consultation over the stored per-contact history
//! - Voice-note round trips (transcribe in, synthesize out)
//! - Humanized replies (presence indicators and delays)
//! - Call rejection

pub mod ai_client;
pub mod context;
pub mod language_detect;
pub mod orchestrator;
pub mod state;
pub mod trigger;

pub use ai_client::AiClient;
pub use context::AgentContext;
pub use language_detect::detect_language;
pub use orchestrator::{Dispatch, Orchestrator};
pub use state::DialogueState;
pub use trigger::{match_trigger, FireReason, TriggerDecision};

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: DialogueState,
        to: DialogueState,
    },

    #[error("Timeout")]
    Timeout,
}

impl From<chat_agent_core::Error> for AgentError {
    fn from(err: chat_agent_core::Error) -> Self {
        match err {
            chat_agent_core::Error::Timeout(_) => AgentError::Timeout,
            other if other.is_media() => AgentError::Pipeline(other.to_string()),
            other => AgentError::Transport(other.to_string()),
        }
    }
}

impl From<chat_agent_pipeline::PipelineError> for AgentError {
    fn from(err: chat_agent_pipeline::PipelineError) -> Self {
        AgentError::Pipeline(err.to_string())
    }
}

impl From<chat_agent_llm::LlmError> for AgentError {
    fn from(err: chat_agent_llm::LlmError) -> Self {
        match err {
            chat_agent_llm::LlmError::Timeout => AgentError::Timeout,
            other => AgentError::Llm(other.to_string()),
        }
    }
}

impl From<chat_agent_persistence::PersistenceError> for AgentError {
    fn from(err: chat_agent_persistence::PersistenceError) -> Self {
        AgentError::Persistence(err.to_string())
    }
}

impl From<AgentError> for chat_agent_core::Error {
    fn from(err: AgentError) -> Self {
        use chat_agent_core::Error;

        match err {
            AgentError::Transport(msg) => Error::Transport(msg),
            AgentError::Llm(msg) => Error::Llm(msg),
            AgentError::Pipeline(msg) => Error::Media(msg),
            AgentError::Persistence(msg) => Error::Persistence(msg),
            AgentError::InvalidTransition { from, to } => {
                Error::Config(format!("invalid transition from {:?} to {:?}", from, to))
            }
            AgentError::Timeout => Error::Timeout(0),
        }
    }
}
