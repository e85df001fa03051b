//! AI consultation
//!
//! One completion request per message: system prompt, the contact's stored
//! history and the new user text. Only successful exchanges are recorded, so
//! a failed request leaves the history untouched.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chat_agent_config::{AiConfig, LlmSettings};
use chat_agent_core::TurnRole;
use chat_agent_llm::{LlmBackend, OpenAIBackend, OpenAIConfig, PromptBuilder};
use chat_agent_persistence::HistoryRepository;

use crate::AgentError;

/// Completion client bound to the conversation store
#[derive(Clone)]
pub struct AiClient {
    backend: Option<Arc<dyn LlmBackend>>,
    store: Arc<dyn HistoryRepository>,
    system_prompt: String,
    timeout: Duration,
}

impl AiClient {
    pub fn new(
        backend: Option<Arc<dyn LlmBackend>>,
        store: Arc<dyn HistoryRepository>,
        system_prompt: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            store,
            system_prompt: system_prompt.into(),
            timeout,
        }
    }

    /// Build the OpenRouter client from configuration
    ///
    /// Without a credential the client is created disabled and every
    /// consultation fails without touching the network.
    pub fn from_config(
        llm: &LlmSettings,
        ai: &AiConfig,
        store: Arc<dyn HistoryRepository>,
    ) -> Self {
        let backend = match OpenAIConfig::from_settings(llm, ai).map(OpenAIBackend::new) {
            Some(Ok(backend)) => {
                tracing::info!(model = %ai.model, endpoint = %llm.endpoint, "Completion backend ready");
                Some(Arc::new(backend) as Arc<dyn LlmBackend>)
            }
            Some(Err(e)) => {
                tracing::error!(error = %e, "Failed to create completion backend");
                None
            }
            None => {
                tracing::warn!("No API key configured, AI replies disabled");
                None
            }
        };

        Self::new(backend, store, ai.system_prompt.clone(), llm.timeout())
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn store(&self) -> &Arc<dyn HistoryRepository> {
        &self.store
    }

    /// Ask for a reply to `text`; `None` on any failure
    pub async fn consult(&self, contact: &str, text: &str) -> Option<String> {
        match self.try_consult(contact, text).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                metrics::counter!("chat_agent_ai_failures_total").increment(1);
                tracing::error!(contact = %contact, error = %e, "AI consultation failed");
                None
            }
        }
    }

    async fn try_consult(&self, contact: &str, text: &str) -> Result<String, AgentError> {
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| AgentError::Llm("no API key configured".to_string()))?;

        // history read and both appends happen under the same guard
        let _guard = self.store.lock_contact(contact).await;
        let history = self.store.history(contact).await;

        let messages = PromptBuilder::new()
            .system_prompt(&self.system_prompt)
            .with_turns(&history)
            .user_message(text)
            .build();

        tracing::debug!(
            contact = %contact,
            model = backend.model_name(),
            history = history.len(),
            "Requesting completion"
        );

        let started = Instant::now();
        let result = tokio::time::timeout(self.timeout, backend.generate(&messages))
            .await
            .map_err(|_| AgentError::Timeout)??;
        metrics::histogram!("chat_agent_ai_latency_seconds").record(started.elapsed().as_secs_f64());

        // stored and sent exactly as completed
        let reply = result.text;
        if reply.trim().is_empty() {
            return Err(AgentError::Llm("empty completion".to_string()));
        }

        self.store.append_turn(contact, TurnRole::User, text).await;
        self.store
            .append_turn(contact, TurnRole::Assistant, &reply)
            .await;

        tracing::info!(
            contact = %contact,
            tokens = result.tokens,
            elapsed_ms = result.total_time_ms,
            finish_reason = ?result.finish_reason,
            "AI reply received"
        );
        Ok(reply)
    }
}
