//! Centralized constants for the chat agent
//!
//! Single source of truth for default values shared by the config structs
//! and the crates that consume them.

/// Completion service defaults
pub mod llm {
    /// OpenRouter (OpenAI-compatible) API base
    pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1";

    pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

    pub const DEFAULT_MAX_TOKENS: usize = 500;

    pub const DEFAULT_TEMPERATURE: f32 = 0.8;

    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Persona used when no system prompt is configured
    pub const DEFAULT_SYSTEM_PROMPT: &str = "Voce e Alma, uma coach emocional.";
}

/// Humanizing delays (milliseconds)
pub mod humanize {
    pub const TEXT_DELAY_MS: u64 = 5_000;
    pub const AUDIO_DELAY_MS: u64 = 10_000;
}

/// Audio tooling defaults
pub mod audio {
    pub const DEFAULT_VOICE: &str = "pt-BR-ThalitaMultilingualNeural";
    pub const DEFAULT_WHISPER_MODEL: &str = "large";
    pub const WHISPER_COMMAND: &str = "whisper";
    pub const TTS_COMMAND: &str = "edge-tts";
    pub const STT_TIMEOUT_SECS: u64 = 300;
    pub const TTS_TIMEOUT_SECS: u64 = 60;
    pub const DOWNLOAD_TIMEOUT_SECS: u64 = 60;
}

/// Fixed replies sent to contacts
pub mod messages {
    pub const AI_FAILURE: &str = "Perdon amor, tuve un problema. Puedes repetir?";
    pub const TRANSCRIPTION_FAILURE: &str =
        "Disculpa amor, no pude entender tu audio. Me lo puedes escribir por favor?";
    pub const DOWNLOAD_FAILURE: &str = "Tuve un problema para escuchar tu audio. Puedes escribirme?";
    pub const CALL_REJECTION: &str = "Hola amor, en este momento no puedo atender llamadas, \
        pero escribeme y te respondo con todo carino. Estoy aqui para ti.";
}

/// File locations relative to the working directory
pub mod paths {
    pub const DOWNLOADS_DIR: &str = "downloads";
    pub const FILES_DIR: &str = "arquivos";
    pub const HISTORY_FILE: &str = "historico_conversas.json";
    pub const TRIGGERS_FILE: &str = "gatilhos_arquivos.json";
    pub const AI_CONFIG_FILE: &str = "ia_config.json";
    pub const OVERLAY_FILE: &str = "config_bot.json";
}

/// Environment variables
pub mod env {
    /// Credential override for the completion service
    pub const API_KEY: &str = "OPENROUTER_API_KEY";
    /// Selects `config/{env}` on top of `config/default`
    pub const ENVIRONMENT: &str = "CHAT_AGENT_ENV";
    /// Prefix for setting overrides (`CHAT_AGENT__BOT__NAME=...`)
    pub const PREFIX: &str = "CHAT_AGENT";
}
