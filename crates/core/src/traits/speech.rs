//! Speech processing traits
//!
//! Both engines work on files: the channel delivers voice notes as files and
//! expects files back, and the engines themselves are external tools.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::{Language, Result};

/// Speech-to-Text interface
///
/// Implementations:
/// - `WhisperCliStt` - openai-whisper command line tool
///
/// # Example
///
/// ```ignore
/// let stt: Arc<dyn SpeechToText> = Arc::new(WhisperCliStt::new(config));
/// if let Some(text) = stt.transcribe(Path::new("downloads/audio_1.ogg")).await? {
///     println!("Transcribed: {}", text);
/// }
/// ```
#[async_trait]
pub trait SpeechToText: Send + Sync + 'static {
    /// Transcribe an audio file
    ///
    /// Returns `Ok(None)` when the engine ran but produced no transcript.
    async fn transcribe(&self, audio_path: &Path) -> Result<Option<String>>;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}

/// Text-to-Speech interface
///
/// Implementations:
/// - `EdgeTts` - edge-tts command line tool
#[async_trait]
pub trait TextToSpeech: Send + Sync + 'static {
    /// Synthesize text into an audio file
    ///
    /// Returns the produced file, or `Ok(None)` when the engine did not
    /// produce an artifact. The caller owns (and deletes) the file.
    async fn synthesize(&self, text: &str, language: Language) -> Result<Option<PathBuf>>;

    /// Voice profile used for synthesis
    fn voice(&self) -> &str;
}
