//! Text-to-speech through the edge-tts command line tool

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chat_agent_config::{AudioConfig, PathsConfig};
use chat_agent_core::{Language, Result, TextToSpeech};

use crate::command::{stderr_tail, CommandSpec};
use crate::{remove_quietly, reserve_path, PipelineError};

/// edge-tts invocation settings
#[derive(Debug, Clone)]
pub struct EdgeTtsConfig {
    /// Command line of the tool
    pub command: String,
    /// Voice profile; multilingual voices cover every detected language
    pub voice: String,
    /// Where synthesized replies are written
    pub output_dir: PathBuf,
    pub timeout: Duration,
}

impl EdgeTtsConfig {
    pub fn from_settings(audio: &AudioConfig, paths: &PathsConfig) -> Self {
        Self {
            command: audio.tts_command.clone(),
            voice: audio.voice.clone(),
            output_dir: paths.downloads_dir.clone(),
            timeout: audio.tts_timeout(),
        }
    }
}

impl Default for EdgeTtsConfig {
    fn default() -> Self {
        Self::from_settings(&AudioConfig::default(), &PathsConfig::default())
    }
}

/// edge-tts backend
pub struct EdgeTts {
    config: EdgeTtsConfig,
}

impl EdgeTts {
    pub fn new(config: EdgeTtsConfig) -> Self {
        Self { config }
    }

    /// Arguments go straight to the process; the text needs no quoting
    fn build_args(&self, text: &str, output: &Path) -> Vec<String> {
        vec![
            "--voice".to_string(),
            self.config.voice.clone(),
            "--text".to_string(),
            text.to_string(),
            "--write-media".to_string(),
            output.to_string_lossy().into_owned(),
        ]
    }

    async fn run(&self, text: &str, output: &Path) -> std::result::Result<bool, PipelineError> {
        let spec = CommandSpec::parse(&self.config.command)
            .ok_or_else(|| PipelineError::Tts("empty tts command".to_string()))?;

        let result = spec.run(self.build_args(text, output), self.config.timeout).await?;
        if !result.status.success() {
            return Err(PipelineError::Tts(format!(
                "edge-tts exited with {}: {}",
                result.status,
                stderr_tail(&result)
            )));
        }

        // The reserved placeholder is empty until the tool writes to it
        let written = tokio::fs::metadata(output)
            .await
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        Ok(written)
    }
}

#[async_trait]
impl TextToSpeech for EdgeTts {
    async fn synthesize(&self, text: &str, language: Language) -> Result<Option<PathBuf>> {
        let start = Instant::now();
        let output = reserve_path(&self.config.output_dir, "resposta", "mp3")
            .await
            .map_err(PipelineError::from)?;

        match self.run(text, &output).await {
            Ok(true) => {
                tracing::info!(
                    voice = %self.config.voice,
                    language = %language,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    path = %output.display(),
                    "Speech synthesized"
                );
                Ok(Some(output))
            }
            Ok(false) => {
                tracing::warn!(path = %output.display(), "edge-tts produced no audio");
                remove_quietly(&output).await;
                Ok(None)
            }
            Err(e) => {
                tracing::error!(error = %e, "Speech synthesis failed");
                remove_quietly(&output).await;
                Err(e.into())
            }
        }
    }

    fn voice(&self) -> &str {
        &self.config.voice
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args() {
        let tts = EdgeTts::new(EdgeTtsConfig::default());
        let args = tts.build_args("diga \"oi\"", Path::new("downloads/resposta_1.mp3"));
        assert_eq!(
            args,
            vec![
                "--voice",
                "pt-BR-ThalitaMultilingualNeural",
                "--text",
                "diga \"oi\"",
                "--write-media",
                "downloads/resposta_1.mp3",
            ]
        );
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::fs;
        use tempfile::TempDir;

        const FAKE_TTS: &str = r#"
out=""
text=""
while [ $# -gt 0 ]; do
  case "$1" in
    --write-media) out="$2"; shift ;;
    --text) text="$2"; shift ;;
  esac
  shift
done
printf '%s' "$text" > "$out.args"
printf 'ID3fake' > "$out"
"#;

        fn fixture(script: &str) -> (TempDir, EdgeTts) {
            let dir = TempDir::new().unwrap();
            let script_path = dir.path().join("fake_tts.sh");
            fs::write(&script_path, script).unwrap();
            let tts = EdgeTts::new(EdgeTtsConfig {
                command: format!("sh {}", script_path.display()),
                voice: "es-MX-DaliaNeural".to_string(),
                output_dir: dir.path().join("out"),
                timeout: Duration::from_secs(10),
            });
            (dir, tts)
        }

        #[tokio::test]
        async fn test_synthesize_writes_artifact() {
            let (_dir, tts) = fixture(FAKE_TTS);
            let path = tts
                .synthesize("ella dijo \"hola\"", Language::Spanish)
                .await
                .unwrap()
                .unwrap();

            assert!(path
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("resposta_"));
            assert_eq!(fs::read(&path).unwrap(), b"ID3fake");

            let mut args_path = path.clone().into_os_string();
            args_path.push(".args");
            assert_eq!(
                fs::read_to_string(args_path).unwrap(),
                "ella dijo \"hola\""
            );
        }

        #[tokio::test]
        async fn test_quotes_reach_tool_verbatim() {
            let (_dir, tts) = fixture(FAKE_TTS);
            let text = r#"ela disse "oi" e 'tchau' \o/ $HOME"#;
            let path = tts
                .synthesize(text, Language::Portuguese)
                .await
                .unwrap()
                .unwrap();

            let mut args_path = path.into_os_string();
            args_path.push(".args");
            assert_eq!(fs::read_to_string(args_path).unwrap(), text);
        }

        #[tokio::test]
        async fn test_no_artifact_is_none() {
            let (dir, tts) = fixture("exit 0\n");
            let result = tts.synthesize("hola", Language::Spanish).await.unwrap();
            assert!(result.is_none());
            // placeholder removed
            assert_eq!(fs::read_dir(dir.path().join("out")).unwrap().count(), 0);
        }

        #[tokio::test]
        async fn test_tool_failure_is_error() {
            let (_dir, tts) = fixture("exit 1\n");
            let err = tts.synthesize("hola", Language::Spanish).await.unwrap_err();
            assert!(err.is_media());
        }
    }
}
