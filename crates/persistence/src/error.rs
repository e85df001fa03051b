//! Persistence error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt history file {path}: {message}")]
    Corrupt { path: String, message: String },
}

impl PersistenceError {
    pub(crate) fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        PersistenceError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}

impl From<PersistenceError> for chat_agent_core::Error {
    fn from(err: PersistenceError) -> Self {
        chat_agent_core::Error::Persistence(err.to_string())
    }
}
