//! Speech-to-text through the whisper command line tool
//!
//! Whisper writes `<stem>.txt` into the output directory; the transcript is
//! read from there and both the audio and the artifact are deleted.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chat_agent_config::{AudioConfig, PathsConfig};
use chat_agent_core::{Result, SpeechToText};

use crate::command::{stderr_tail, CommandSpec};
use crate::{remove_quietly, PipelineError};

/// Whisper invocation settings
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Command line of the tool
    pub command: String,
    /// Model name (tiny, base, small, medium, large)
    pub model: String,
    /// `cuda` or `cpu`
    pub device: String,
    /// Where whisper writes its transcript
    pub output_dir: PathBuf,
    pub timeout: Duration,
}

impl WhisperConfig {
    pub fn from_settings(audio: &AudioConfig, paths: &PathsConfig) -> Self {
        Self {
            command: audio.whisper_command.clone(),
            model: audio.whisper_model.clone(),
            device: audio.device().to_string(),
            output_dir: paths.downloads_dir.clone(),
            timeout: audio.stt_timeout(),
        }
    }
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self::from_settings(&AudioConfig::default(), &PathsConfig::default())
    }
}

/// Whisper CLI backend
pub struct WhisperCliStt {
    config: WhisperConfig,
}

impl WhisperCliStt {
    pub fn new(config: WhisperConfig) -> Self {
        Self { config }
    }

    /// Path whisper writes the transcript of `audio_path` to
    pub fn transcript_path(&self, audio_path: &Path) -> PathBuf {
        let stem = audio_path
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_default();
        let mut name = stem;
        name.push(".txt");
        self.config.output_dir.join(name)
    }

    fn build_args(&self, audio_path: &Path) -> Vec<String> {
        vec![
            audio_path.to_string_lossy().into_owned(),
            "--model".to_string(),
            self.config.model.clone(),
            "--device".to_string(),
            self.config.device.clone(),
            "--output_format".to_string(),
            "txt".to_string(),
            "--output_dir".to_string(),
            self.config.output_dir.to_string_lossy().into_owned(),
        ]
    }

    async fn run(&self, audio_path: &Path, transcript: &Path) -> std::result::Result<Option<String>, PipelineError> {
        let spec = CommandSpec::parse(&self.config.command)
            .ok_or_else(|| PipelineError::Stt("empty whisper command".to_string()))?;

        let output = spec.run(self.build_args(audio_path), self.config.timeout).await?;
        if !output.status.success() {
            return Err(PipelineError::Stt(format!(
                "whisper exited with {}: {}",
                output.status,
                stderr_tail(&output)
            )));
        }

        match tokio::fs::read_to_string(transcript).await {
            Ok(text) => {
                let text = text.trim().to_string();
                Ok((!text.is_empty()).then_some(text))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %transcript.display(), "Whisper produced no transcript");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SpeechToText for WhisperCliStt {
    async fn transcribe(&self, audio_path: &Path) -> Result<Option<String>> {
        let start = Instant::now();
        let transcript = self.transcript_path(audio_path);

        let result = self.run(audio_path, &transcript).await;

        remove_quietly(audio_path).await;
        remove_quietly(&transcript).await;

        match &result {
            Ok(Some(text)) => tracing::info!(
                model = %self.config.model,
                chars = text.chars().count(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Audio transcribed"
            ),
            Ok(None) => {}
            Err(e) => tracing::error!(error = %e, "Transcription failed"),
        }

        Ok(result?)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
