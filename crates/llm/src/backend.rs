//! LLM Backend implementations
//!
//! A single OpenAI-compatible backend covers OpenRouter, OpenAI and local
//! servers exposing `/chat/completions`. Requests are single-shot: no
//! streaming, no retries.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use chat_agent_config::constants::llm as defaults;
use chat_agent_config::{AiConfig, LlmSettings};

use crate::prompt::Message;
use crate::LlmError;

/// LLM generation result
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// Generated text
    pub text: String,
    /// Tokens generated (0 when the service does not report usage)
    pub tokens: usize,
    /// Total generation time (ms)
    pub total_time_ms: u64,
    /// Finish reason
    pub finish_reason: FinishReason,
}

/// Finish reason
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
}

/// LLM Backend trait
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generate a response
    async fn generate(&self, messages: &[Message]) -> Result<GenerationResult, LlmError>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Configuration for OpenAI-compatible backends
#[derive(Clone)]
pub struct OpenAIConfig {
    /// API base (OpenRouter: https://openrouter.ai/api/v1)
    pub endpoint: String,
    /// API key
    pub api_key: String,
    /// Model name (openai/gpt-4o-mini, anthropic/claude-3-haiku, etc.)
    pub model: String,
    /// Maximum tokens to generate
    pub max_tokens: usize,
    /// Temperature (0-2)
    pub temperature: f32,
    /// Request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for OpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::DEFAULT_ENDPOINT.to_string(),
            api_key: String::new(),
            model: defaults::DEFAULT_MODEL.to_string(),
            max_tokens: defaults::DEFAULT_MAX_TOKENS,
            temperature: defaults::DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(defaults::DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl OpenAIConfig {
    /// Build from loaded settings
    ///
    /// Returns `None` when no credential is configured.
    pub fn from_settings(llm: &LlmSettings, ai: &AiConfig) -> Option<Self> {
        let api_key = ai.api_key.clone()?;
        Some(Self {
            endpoint: llm.endpoint.clone(),
            api_key,
            model: ai.model.clone(),
            max_tokens: llm.max_tokens,
            temperature: llm.temperature,
            timeout: llm.timeout(),
        })
    }
}

/// OpenAI-compatible backend
///
/// Works with:
/// - OpenRouter
/// - OpenAI
/// - vLLM and other local servers with OpenAI-compatible APIs
pub struct OpenAIBackend {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIBackend {
    /// Create new OpenAI backend
    pub fn new(config: OpenAIConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::Configuration("API key required".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Get the full API URL for chat completions
    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))
    }

    /// Build request headers
    fn build_headers(&self) -> reqwest::header::HeaderMap {
        use reqwest::header::HeaderValue;

        let mut headers = reqwest::header::HeaderMap::new();

        let auth_value = format!("Bearer {}", self.config.api_key);
        if let Ok(val) = HeaderValue::from_str(&auth_value) {
            headers.insert(reqwest::header::AUTHORIZATION, val);
        }

        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        headers
    }

    fn build_request(&self, messages: &[Message]) -> OpenAIChatRequest {
        OpenAIChatRequest {
            model: self.config.model.clone(),
            messages: messages
                .iter()
                .map(|m| OpenAIMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
            stream: Some(false),
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAIBackend {
    async fn generate(&self, messages: &[Message]) -> Result<GenerationResult, LlmError> {
        let start = Instant::now();
        let request = self.build_request(messages);

        let response = self
            .client
            .post(self.chat_url())
            .headers(self.build_headers())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let response: OpenAIChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

        let text = choice.message.content.unwrap_or_default();
        if text.trim().is_empty() {
            return Err(LlmError::Generation("Empty completion".to_string()));
        }

        let total_time_ms = start.elapsed().as_millis() as u64;
        let tokens = response.usage.map(|u| u.completion_tokens).unwrap_or(0);

        tracing::debug!(
            model = %self.config.model,
            tokens,
            total_time_ms,
            "Completion received"
        );

        Ok(GenerationResult {
            text,
            tokens,
            total_time_ms,
            finish_reason: match choice.finish_reason.as_deref() {
                Some("length") => FinishReason::Length,
                Some("content_filter") => FinishReason::ContentFilter,
                _ => FinishReason::Stop,
            },
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    completion_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn config_for(endpoint: String) -> OpenAIConfig {
        OpenAIConfig {
            endpoint,
            api_key: "sk-test".to_string(),
            timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    #[test]
    fn test_openai_config_default() {
        let config = OpenAIConfig::default();
        assert_eq!(config.endpoint, "https://openrouter.ai/api/v1");
        assert_eq!(config.model, "openai/gpt-4o-mini");
        assert_eq!(config.max_tokens, 500);
        assert!((config.temperature - 0.8).abs() < f32::EPSILON);
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            OpenAIBackend::new(OpenAIConfig::default()),
            Err(LlmError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_settings_without_credential() {
        let llm = LlmSettings::default();
        let ai = AiConfig::default();
        assert!(OpenAIConfig::from_settings(&llm, &ai).is_none());
    }

    #[test]
    fn test_chat_url_and_headers() {
        let backend =
            OpenAIBackend::new(config_for("https://openrouter.ai/api/v1/".to_string())).unwrap();
        assert_eq!(
            backend.chat_url(),
            "https://openrouter.ai/api/v1/chat/completions"
        );

        let headers = backend.build_headers();
        assert_eq!(
            headers.get(reqwest::header::AUTHORIZATION).unwrap(),
            "Bearer sk-test"
        );
    }

    #[test]
    fn test_request_serialization() {
        let backend = OpenAIBackend::new(OpenAIConfig {
            api_key: "k".to_string(),
            model: "m".to_string(),
            ..Default::default()
        })
        .unwrap();
        let request = backend.build_request(&[Message::system("s"), Message::user("u")]);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "m");
        assert_eq!(value["max_tokens"], 500);
        assert_eq!(value["stream"], false);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "u");
    }

    #[tokio::test]
    async fn test_generate_against_mock_server() {
        let router = Router::new().route(
            "/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["authorization"], "Bearer sk-test");
                let last = body["messages"].as_array().unwrap().last().unwrap().clone();
                Json(json!({
                    "choices": [{
                        "message": { "role": "assistant", "content": format!("eco: {}", last["content"].as_str().unwrap()) },
                        "finish_reason": "stop"
                    }],
                    "usage": { "completion_tokens": 3, "prompt_tokens": 10, "total_tokens": 13 }
                }))
            }),
        );
        let endpoint = serve(router).await;

        let backend = OpenAIBackend::new(config_for(endpoint)).unwrap();
        let result = backend.generate(&[Message::user("oi")]).await.unwrap();
        assert_eq!(result.text, "eco: oi");
        assert_eq!(result.tokens, 3);
        assert_eq!(result.finish_reason, FinishReason::Stop);
    }

    #[tokio::test]
    async fn test_generate_http_error() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { (axum::http::StatusCode::UNAUTHORIZED, "bad key") }),
        );
        let endpoint = serve(router).await;

        let backend = OpenAIBackend::new(config_for(endpoint)).unwrap();
        let err = backend.generate(&[Message::user("oi")]).await.unwrap_err();
        assert!(matches!(err, LlmError::Api(ref m) if m.contains("401")));
    }

    #[tokio::test]
    async fn test_generate_empty_choices() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { Json(json!({ "choices": [] })) }),
        );
        let endpoint = serve(router).await;

        let backend = OpenAIBackend::new(config_for(endpoint)).unwrap();
        assert!(matches!(
            backend.generate(&[Message::user("oi")]).await,
            Err(LlmError::InvalidResponse(_))
        ));
    }
}
