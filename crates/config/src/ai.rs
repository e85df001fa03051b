//! Completion service credentials and persona

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{env, llm};
use crate::ConfigError;

/// AI configuration file as written on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiConfigFile {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default, alias = "modelo", alias = "model_id")]
    pub model: Option<String>,

    #[serde(default, alias = "prompt_sistema")]
    pub system_prompt: Option<String>,
}

impl AiConfigFile {
    /// Read the file; a missing file is treated as empty
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "AI config file not found");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Resolved AI configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// `None` disables the AI client entirely
    pub api_key: Option<String>,
    pub model: String,
    pub system_prompt: String,
}

impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt)
            .finish()
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: llm::DEFAULT_MODEL.to_string(),
            system_prompt: llm::DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl AiConfig {
    /// Load from file, then let `OPENROUTER_API_KEY` override the credential
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = AiConfigFile::load(path)?;
        let env_key = std::env::var(env::API_KEY).ok();
        let config = Self::resolve(file, env_key);
        if !config.has_credential() {
            tracing::warn!("No completion service credential configured, AI replies disabled");
        }
        Ok(config)
    }

    /// Merge the file contents with an optional environment credential
    ///
    /// Empty strings count as absent everywhere.
    pub fn resolve(file: AiConfigFile, env_key: Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            api_key: non_empty(env_key).or_else(|| non_empty(file.api_key)),
            model: non_empty(file.model).unwrap_or(defaults.model),
            system_prompt: non_empty(file.system_prompt).unwrap_or(defaults.system_prompt),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
