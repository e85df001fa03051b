//! Shared, read-only dependencies of the dispatcher

use std::path::PathBuf;
use std::sync::Arc;

use chat_agent_config::{BotConfig, HumanizeConfig, MessagesConfig, Settings, TriggerSet};
use chat_agent_core::MessageTransport;
use chat_agent_persistence::HistoryRepository;
use chat_agent_pipeline::AudioPipeline;

use crate::AiClient;

/// Everything a message handler needs, built once at startup
#[derive(Clone)]
pub struct AgentContext {
    pub bot: BotConfig,
    pub messages: MessagesConfig,
    pub humanize: HumanizeConfig,
    /// Directory trigger files are resolved against
    pub files_dir: PathBuf,
    pub triggers: Arc<TriggerSet>,
    pub transport: Arc<dyn MessageTransport>,
    pub audio: AudioPipeline,
    pub ai: AiClient,
}

impl AgentContext {
    pub fn new(
        settings: &Settings,
        triggers: Arc<TriggerSet>,
        transport: Arc<dyn MessageTransport>,
        audio: AudioPipeline,
        ai: AiClient,
    ) -> Self {
        tracing::info!(
            bot = %settings.bot.name,
            triggers = triggers.len(),
            active = triggers.active().count(),
            ai_enabled = ai.is_enabled(),
            "Agent context ready"
        );

        Self {
            bot: settings.bot.clone(),
            messages: settings.messages.clone(),
            humanize: settings.humanize.clone(),
            files_dir: settings.paths.files_dir.clone(),
            triggers,
            transport,
            audio,
            ai,
        }
    }

    pub fn store(&self) -> &Arc<dyn HistoryRepository> {
        self.ai.store()
    }
}
