//! Audio pipeline
//!
//! Voice notes come in as files and replies go out as files, so every stage
//! here is file based:
//! - `WhisperCliStt`: transcription through the whisper command line tool
//! - `EdgeTts`: synthesis through the edge-tts command line tool
//! - `AudioPipeline`: download, transcribe and synthesize with fail-soft results

pub mod audio;
pub mod command;
pub mod stt;
pub mod tts;

pub use audio::AudioPipeline;
pub use command::CommandSpec;
pub use stt::{WhisperCliStt, WhisperConfig};
pub use tts::{EdgeTts, EdgeTtsConfig};

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("STT error: {0}")]
    Stt(String),

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err.to_string())
    }
}

impl From<PipelineError> for chat_agent_core::Error {
    fn from(err: PipelineError) -> Self {
        use chat_agent_core::Error;

        match err {
            PipelineError::Stt(msg) => Error::Stt(msg),
            PipelineError::Tts(msg) => Error::Tts(msg),
            PipelineError::Download(msg) => Error::Media(msg),
            PipelineError::Timeout(ms) => Error::Timeout(ms),
            PipelineError::Io(msg) => Error::Media(msg),
        }
    }
}

/// Milliseconds since the epoch, used to name scratch files
pub(crate) fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Reserve a fresh scratch file named `<prefix>_<epoch_ms>.<ext>`
///
/// The file is created empty so concurrent tasks never share a name; a
/// numeric suffix is added when the millisecond is already taken.
pub(crate) async fn reserve_path(
    dir: &std::path::Path,
    prefix: &str,
    ext: &str,
) -> std::io::Result<std::path::PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let stamp = epoch_millis();

    for attempt in 0u32..100 {
        let name = if attempt == 0 {
            format!("{}_{}.{}", prefix, stamp, ext)
        } else {
            format!("{}_{}_{}.{}", prefix, stamp, attempt, ext)
        };
        let path = dir.join(name);
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(_) => return Ok(path),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        format!("no free scratch name for {}_{}", prefix, stamp),
    ))
}

/// Remove a scratch file, logging instead of failing
pub(crate) async fn remove_quietly(path: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove scratch file");
        }
    }
}
