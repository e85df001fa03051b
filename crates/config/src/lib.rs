//! Configuration management for the chat agent
//!
//! Supports loading configuration from:
//! - TOML/YAML/JSON files under `config/`
//! - The legacy flat overlay file (`config_bot.json`)
//! - Environment variables (CHAT_AGENT_ prefix)
//!
//! Trigger definitions and AI credentials live in their own JSON files and are
//! loaded once at startup; everything here is read-only afterwards.

pub mod ai;
pub mod constants;
pub mod settings;
pub mod triggers;

pub use ai::{AiConfig, AiConfigFile};
pub use settings::{
    load_settings, AudioConfig, BotConfig, GatewayConfig, HumanizeConfig, LlmSettings,
    MessagesConfig, ObservabilityConfig, PathsConfig, PersistenceConfig, RuntimeEnvironment,
    Settings,
};
pub use triggers::{TriggerDefinition, TriggerSet};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
