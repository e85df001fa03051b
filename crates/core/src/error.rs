//! Error types shared across crates

use thiserror::Error;

/// Result alias using the core error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
///
/// Crate-specific errors (`LlmError`, `PipelineError`, ...) convert into this
/// at the seams where collaborators are called through core traits.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Speech-to-text error: {0}")]
    Stt(String),

    #[error("Text-to-speech error: {0}")]
    Tts(String),

    #[error("Media error: {0}")]
    Media(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the failure came from an external media collaborator
    pub fn is_media(&self) -> bool {
        matches!(self, Error::Stt(_) | Error::Tts(_) | Error::Media(_))
    }
}
