//! Completion service integration
//!
//! Features:
//! - `LlmBackend` trait so the dialogue layer can be tested with mocks
//! - OpenAI-compatible chat completions (OpenRouter by default)
//! - Prompt assembly from stored conversation turns

pub mod backend;
pub mod prompt;

pub use backend::{FinishReason, GenerationResult, LlmBackend, OpenAIBackend, OpenAIConfig};
pub use prompt::{Message, PromptBuilder, Role};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for chat_agent_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout => chat_agent_core::Error::Llm("request timed out".to_string()),
            other => chat_agent_core::Error::Llm(other.to_string()),
        }
    }
}
