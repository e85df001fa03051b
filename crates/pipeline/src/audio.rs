//! Voice note handling
//!
//! Download and transcription are separate steps so the caller can tell the
//! two failures apart and answer each with its own apology.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chat_agent_config::Settings;
use chat_agent_core::{InboundEvent, Language, MessageTransport, SpeechToText, TextToSpeech};

use crate::{remove_quietly, reserve_path, PipelineError};

/// Audio pipeline over the transport and the two speech engines
#[derive(Clone)]
pub struct AudioPipeline {
    transport: Arc<dyn MessageTransport>,
    stt: Arc<dyn SpeechToText>,
    tts: Arc<dyn TextToSpeech>,
    downloads_dir: PathBuf,
    download_timeout: Duration,
}

impl AudioPipeline {
    pub fn new(
        transport: Arc<dyn MessageTransport>,
        stt: Arc<dyn SpeechToText>,
        tts: Arc<dyn TextToSpeech>,
        downloads_dir: impl Into<PathBuf>,
        download_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            stt,
            tts,
            downloads_dir: downloads_dir.into(),
            download_timeout,
        }
    }

    pub fn from_settings(
        settings: &Settings,
        transport: Arc<dyn MessageTransport>,
        stt: Arc<dyn SpeechToText>,
        tts: Arc<dyn TextToSpeech>,
    ) -> Self {
        Self::new(
            transport,
            stt,
            tts,
            settings.paths.downloads_dir.clone(),
            settings.audio.download_timeout(),
        )
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    /// Fetch the voice note attached to `event` into `downloads/audio_<ms>.ogg`
    pub async fn download_audio(&self, event: &InboundEvent) -> Result<PathBuf, PipelineError> {
        let bytes = tokio::time::timeout(self.download_timeout, self.transport.download_media(event))
            .await
            .map_err(|_| PipelineError::Timeout(self.download_timeout.as_millis() as u64))?
            .map_err(|e| PipelineError::Download(e.to_string()))?;

        if bytes.is_empty() {
            return Err(PipelineError::Download("empty media payload".to_string()));
        }

        let path = reserve_path(&self.downloads_dir, "audio", "ogg").await?;
        if let Err(e) = tokio::fs::write(&path, &bytes).await {
            remove_quietly(&path).await;
            return Err(e.into());
        }

        tracing::debug!(
            message_id = %event.id,
            bytes = bytes.len(),
            path = %path.display(),
            "Voice note downloaded"
        );
        Ok(path)
    }

    /// Transcribe a downloaded voice note; `None` on any failure
    pub async fn transcribe(&self, path: &Path) -> Option<String> {
        match self.stt.transcribe(path).await {
            Ok(Some(text)) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                tracing::warn!(model = self.stt.model_name(), "Empty transcription");
                None
            }
            Err(e) => {
                tracing::error!(model = self.stt.model_name(), error = %e, "Transcription failed");
                None
            }
        }
    }

    /// Synthesize a reply; `None` on any failure
    pub async fn synthesize(&self, text: &str, language: Language) -> Option<PathBuf> {
        match self.tts.synthesize(text, language).await {
            Ok(Some(path)) if path.exists() => Some(path),
            Ok(_) => {
                tracing::warn!(voice = self.tts.voice(), "Synthesis produced no artifact");
                None
            }
            Err(e) => {
                tracing::error!(voice = self.tts.voice(), error = %e, "Synthesis failed");
                None
            }
        }
    }

    /// Read a synthesized artifact and delete it
    pub async fn take_artifact(&self, path: &Path) -> Result<Vec<u8>, PipelineError> {
        let bytes = tokio::fs::read(path).await;
        remove_quietly(path).await;
        Ok(bytes?)
    }
}
