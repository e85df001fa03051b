//! Main settings module

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{audio, env, humanize, llm, messages, paths};
use crate::ConfigError;

/// Runtime environment enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation, warnings only
    #[default]
    Development,
    /// Staging mode - stricter validation
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if strict validation should be applied
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Bot identity and group policy
    #[serde(default)]
    pub bot: BotConfig,

    /// Fixed replies
    #[serde(default)]
    pub messages: MessagesConfig,

    /// File and directory locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Speech tooling
    #[serde(default)]
    pub audio: AudioConfig,

    /// Humanizing delays
    #[serde(default)]
    pub humanize: HumanizeConfig,

    /// Completion service request parameters
    #[serde(default)]
    pub llm: LlmSettings,

    /// Messaging gateway bridge
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Conversation history durability
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Bot identity and group policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Drop group messages unless the group is allow-listed
    #[serde(default = "default_true")]
    pub ignore_groups: bool,

    /// Group addresses processed even while `ignore_groups` is on
    #[serde(default)]
    pub allowed_groups: Vec<String>,
}

impl BotConfig {
    pub fn is_group_allowed(&self, address: &str) -> bool {
        self.allowed_groups.iter().any(|g| g == address)
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            ignore_groups: true,
            allowed_groups: Vec::new(),
        }
    }
}

fn default_bot_name() -> String {
    "Alma".to_string()
}

fn default_true() -> bool {
    true
}

/// Fixed replies sent to contacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesConfig {
    #[serde(default = "default_ai_failure")]
    pub ai_failure: String,

    #[serde(default = "default_transcription_failure")]
    pub transcription_failure: String,

    #[serde(default = "default_download_failure")]
    pub download_failure: String,

    #[serde(default = "default_call_rejection")]
    pub call_rejection: String,
}

fn default_ai_failure() -> String {
    messages::AI_FAILURE.to_string()
}

fn default_transcription_failure() -> String {
    messages::TRANSCRIPTION_FAILURE.to_string()
}

fn default_download_failure() -> String {
    messages::DOWNLOAD_FAILURE.to_string()
}

fn default_call_rejection() -> String {
    messages::CALL_REJECTION.to_string()
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            ai_failure: default_ai_failure(),
            transcription_failure: default_transcription_failure(),
            download_failure: default_download_failure(),
            call_rejection: default_call_rejection(),
        }
    }
}

/// File and directory locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Scratch directory for inbound audio and synthesized replies
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,

    /// Directory trigger files are resolved against
    #[serde(default = "default_files_dir")]
    pub files_dir: PathBuf,

    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,

    #[serde(default = "default_triggers_file")]
    pub triggers_file: PathBuf,

    #[serde(default = "default_ai_config_file")]
    pub ai_config_file: PathBuf,
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from(paths::DOWNLOADS_DIR)
}

fn default_files_dir() -> PathBuf {
    PathBuf::from(paths::FILES_DIR)
}

fn default_history_file() -> PathBuf {
    PathBuf::from(paths::HISTORY_FILE)
}

fn default_triggers_file() -> PathBuf {
    PathBuf::from(paths::TRIGGERS_FILE)
}

fn default_ai_config_file() -> PathBuf {
    PathBuf::from(paths::AI_CONFIG_FILE)
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            downloads_dir: default_downloads_dir(),
            files_dir: default_files_dir(),
            history_file: default_history_file(),
            triggers_file: default_triggers_file(),
            ai_config_file: default_ai_config_file(),
        }
    }
}

/// Speech tooling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Synthesis voice profile
    #[serde(default = "default_voice")]
    pub voice: String,

    #[serde(default = "default_whisper_model")]
    pub whisper_model: String,

    /// Run transcription on the GPU (`--device cuda`)
    #[serde(default = "default_true")]
    pub use_gpu: bool,

    #[serde(default = "default_whisper_command")]
    pub whisper_command: String,

    #[serde(default = "default_tts_command")]
    pub tts_command: String,

    #[serde(default = "default_stt_timeout")]
    pub stt_timeout_secs: u64,

    #[serde(default = "default_tts_timeout")]
    pub tts_timeout_secs: u64,

    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
}

fn default_voice() -> String {
    audio::DEFAULT_VOICE.to_string()
}

fn default_whisper_model() -> String {
    audio::DEFAULT_WHISPER_MODEL.to_string()
}

fn default_whisper_command() -> String {
    audio::WHISPER_COMMAND.to_string()
}

fn default_tts_command() -> String {
    audio::TTS_COMMAND.to_string()
}

fn default_stt_timeout() -> u64 {
    audio::STT_TIMEOUT_SECS
}

fn default_tts_timeout() -> u64 {
    audio::TTS_TIMEOUT_SECS
}

fn default_download_timeout() -> u64 {
    audio::DOWNLOAD_TIMEOUT_SECS
}

impl AudioConfig {
    pub fn device(&self) -> &'static str {
        if self.use_gpu {
            "cuda"
        } else {
            "cpu"
        }
    }

    pub fn stt_timeout(&self) -> Duration {
        Duration::from_secs(self.stt_timeout_secs)
    }

    pub fn tts_timeout(&self) -> Duration {
        Duration::from_secs(self.tts_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            voice: default_voice(),
            whisper_model: default_whisper_model(),
            use_gpu: true,
            whisper_command: default_whisper_command(),
            tts_command: default_tts_command(),
            stt_timeout_secs: default_stt_timeout(),
            tts_timeout_secs: default_tts_timeout(),
            download_timeout_secs: default_download_timeout(),
        }
    }
}

/// Delays applied before a reply is sent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanizeConfig {
    #[serde(default = "default_text_delay")]
    pub text_delay_ms: u64,

    #[serde(default = "default_audio_delay")]
    pub audio_delay_ms: u64,
}

fn default_text_delay() -> u64 {
    humanize::TEXT_DELAY_MS
}

fn default_audio_delay() -> u64 {
    humanize::AUDIO_DELAY_MS
}

impl HumanizeConfig {
    /// No delays at all
    pub fn immediate() -> Self {
        Self {
            text_delay_ms: 0,
            audio_delay_ms: 0,
        }
    }

    pub fn text_delay(&self) -> Duration {
        Duration::from_millis(self.text_delay_ms)
    }

    pub fn audio_delay(&self) -> Duration {
        Duration::from_millis(self.audio_delay_ms)
    }
}

impl Default for HumanizeConfig {
    fn default() -> Self {
        Self {
            text_delay_ms: default_text_delay(),
            audio_delay_ms: default_audio_delay(),
        }
    }
}

/// Completion request parameters
///
/// Credentials, model and persona live in the AI configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_endpoint() -> String {
    llm::DEFAULT_ENDPOINT.to_string()
}

fn default_max_tokens() -> usize {
    llm::DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f32 {
    llm::DEFAULT_TEMPERATURE
}

fn default_llm_timeout() -> u64 {
    llm::DEFAULT_TIMEOUT_SECS
}

impl LlmSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Messaging gateway bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the gateway's outbound API
    #[serde(default = "default_gateway_url")]
    pub url: String,

    /// Webhook listener host
    #[serde(default = "default_host")]
    pub host: String,

    /// Webhook listener port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,

    /// Interval between gateway status polls
    #[serde(default = "default_status_poll")]
    pub status_poll_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_gateway_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_reconnect_delay() -> u64 {
    5
}

fn default_status_poll() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    30
}

impl GatewayConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_secs(self.status_poll_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            host: default_host(),
            port: default_port(),
            reconnect_delay_secs: default_reconnect_delay(),
            status_poll_secs: default_status_poll(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Conversation history durability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Write-through to the history file (false = in-memory only)
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (json or pretty)
    #[serde(default)]
    pub log_json: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_bot()?;
        self.validate_llm()?;
        self.validate_audio()?;
        self.validate_gateway()?;
        Ok(())
    }

    fn validate_bot(&self) -> Result<(), ConfigError> {
        if self.bot.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "bot.name".to_string(),
                message: "Bot name cannot be empty".to_string(),
            });
        }

        if !self.bot.ignore_groups && !self.bot.allowed_groups.is_empty() {
            tracing::warn!(
                groups = self.bot.allowed_groups.len(),
                "bot.allowed_groups has no effect while bot.ignore_groups is off"
            );
        }

        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        let llm = &self.llm;

        if !llm.endpoint.starts_with("http://") && !llm.endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "llm.endpoint".to_string(),
                message: format!("Must be an http(s) URL, got {}", llm.endpoint),
            });
        }

        if llm.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.max_tokens".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm.temperature".to_string(),
                message: format!("Must be between 0.0 and 2.0, got {}", llm.temperature),
            });
        }

        if llm.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.timeout_secs".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        Ok(())
    }

    fn validate_audio(&self) -> Result<(), ConfigError> {
        let audio = &self.audio;

        for (field, value) in [
            ("audio.stt_timeout_secs", audio.stt_timeout_secs),
            ("audio.tts_timeout_secs", audio.tts_timeout_secs),
            ("audio.download_timeout_secs", audio.download_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: "Timeout must be at least 1 second".to_string(),
                });
            }
        }

        if audio.voice.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "audio.voice".to_string(),
                message: "Voice cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    fn validate_gateway(&self) -> Result<(), ConfigError> {
        let gateway = &self.gateway;

        if gateway.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "gateway.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if gateway.status_poll_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "gateway.status_poll_secs".to_string(),
                message: "Poll interval must be at least 1 second".to_string(),
            });
        }

        if self.environment.is_strict() && gateway.url.contains("127.0.0.1") {
            tracing::warn!(
                url = %gateway.url,
                "gateway.url points at localhost outside development"
            );
        }

        Ok(())
    }
}

/// Load settings from the working directory
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_in(Path::new("."), env)
}

/// Load settings with all files resolved against `base_dir`
///
/// Precedence (lowest first): built-in defaults, `config/default`,
/// `config/{env}`, the legacy overlay file, `CHAT_AGENT__*` variables.
pub fn load_settings_in(base_dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    // Load default config
    let default_path = base_dir.join("config/default");
    builder = builder.add_source(File::with_name(&default_path.to_string_lossy()).required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        let env_path = base_dir.join(format!("config/{}", env_name));
        builder = builder.add_source(File::with_name(&env_path.to_string_lossy()).required(false));
    }

    // Legacy overlay written by the setup tooling
    let overlay_path = base_dir.join(paths::OVERLAY_FILE);
    if overlay_path.exists() {
        let raw = std::fs::read_to_string(&overlay_path)?;
        let value: Value = serde_json::from_str(&raw)?;
        let nested = legacy_overlay(value);
        tracing::debug!(path = %overlay_path.display(), "Applying overlay configuration");
        builder = builder.add_source(File::from_str(&nested.to_string(), FileFormat::Json));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix(env::PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    // Validate
    settings.validate()?;

    Ok(settings)
}

/// Map the flat overlay keys onto the nested settings layout
///
/// Keys that are not recognized are kept as-is, so the overlay may also use
/// the nested layout directly.
fn legacy_overlay(value: Value) -> Value {
    let Value::Object(flat) = value else {
        return Value::Object(Map::new());
    };

    let mut out = Map::new();
    for (key, value) in flat {
        let target = match key.as_str() {
            "nomeBot" => Some(("bot", "name")),
            "ignorarGrupos" => Some(("bot", "ignore_groups")),
            "gruposPermitidos" => Some(("bot", "allowed_groups")),
            "voz" => Some(("audio", "voice")),
            "modeloWhisper" => Some(("audio", "whisper_model")),
            "usarGPU" => Some(("audio", "use_gpu")),
            _ => None,
        };

        match target {
            Some((section, field)) => {
                let entry = out
                    .entry(section.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(section) = entry {
                    section.insert(field.to_string(), value);
                }
            }
            None => merge_into(&mut out, key, value),
        }
    }

    Value::Object(out)
}

fn merge_into(out: &mut Map<String, Value>, key: String, value: Value) {
    match (out.get_mut(&key), value) {
        (Some(Value::Object(existing)), Value::Object(incoming)) => {
            for (k, v) in incoming {
                existing.entry(k).or_insert(v);
            }
        }
        (_, value) => {
            out.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.bot.name, "Alma");
        assert!(settings.bot.ignore_groups);
        assert_eq!(settings.audio.voice, "pt-BR-ThalitaMultilingualNeural");
        assert_eq!(settings.audio.whisper_model, "large");
        assert_eq!(settings.audio.device(), "cuda");
        assert_eq!(settings.humanize.text_delay_ms, 5_000);
        assert_eq!(settings.humanize.audio_delay_ms, 10_000);
        assert_eq!(settings.llm.max_tokens, 500);
        assert_eq!(settings.gateway.port, 8080);
        assert!(settings.persistence.enabled);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings::default();
        settings.llm.temperature = 3.5;
        assert!(settings.validate().is_err());

        settings.llm.temperature = 0.8;
        settings.audio.stt_timeout_secs = 0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("audio.stt_timeout_secs"));

        settings.audio.stt_timeout_secs = 300;
        settings.gateway.port = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_group_allow_list() {
        let mut bot = BotConfig::default();
        assert!(!bot.is_group_allowed("123@g.us"));
        bot.allowed_groups.push("123@g.us".to_string());
        assert!(bot.is_group_allowed("123@g.us"));
    }

    #[test]
    fn test_legacy_overlay_mapping() {
        let nested = legacy_overlay(json!({
            "nomeBot": "Luz",
            "ignorarGrupos": false,
            "usarGPU": false,
            "voz": "es-MX-DaliaNeural",
            "humanize": { "text_delay_ms": 0 }
        }));

        assert_eq!(nested["bot"]["name"], "Luz");
        assert_eq!(nested["bot"]["ignore_groups"], false);
        assert_eq!(nested["audio"]["use_gpu"], false);
        assert_eq!(nested["audio"]["voice"], "es-MX-DaliaNeural");
        assert_eq!(nested["humanize"]["text_delay_ms"], 0);
    }

    #[test]
    fn test_legacy_overlay_non_object() {
        assert_eq!(legacy_overlay(json!([1, 2])), json!({}));
    }

    #[test]
    fn test_load_settings_with_overlay() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config_bot.json"),
            r#"{ "nomeBot": "Luz", "modeloWhisper": "medium", "gruposPermitidos": ["9@g.us"] }"#,
        )
        .unwrap();

        let settings = load_settings_in(dir.path(), None).unwrap();
        assert_eq!(settings.bot.name, "Luz");
        assert_eq!(settings.audio.whisper_model, "medium");
        assert!(settings.bot.is_group_allowed("9@g.us"));
        // untouched sections keep their defaults
        assert_eq!(settings.llm.endpoint, "https://openrouter.ai/api/v1");
    }

    #[test]
    fn test_load_settings_layered_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("config")).unwrap();
        fs::write(
            dir.path().join("config/default.json"),
            r#"{ "gateway": { "port": 9000 }, "bot": { "name": "Base" } }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("config/production.json"),
            r#"{ "environment": "production", "gateway": { "port": 9100 } }"#,
        )
        .unwrap();
        fs::write(dir.path().join("config_bot.json"), r#"{ "nomeBot": "Overlay" }"#).unwrap();

        let settings = load_settings_in(dir.path(), Some("production")).unwrap();
        assert!(settings.environment.is_production());
        assert_eq!(settings.gateway.port, 9100);
        assert_eq!(settings.bot.name, "Overlay");
    }

    #[test]
    fn test_load_settings_invalid_overlay() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config_bot.json"), "{ not json").unwrap();
        assert!(matches!(
            load_settings_in(dir.path(), None),
            Err(ConfigError::ParseError(_))
        ));
    }
}
