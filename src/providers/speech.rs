//! Speech synthesis backends.
//!
//! * [`ApiSpeechSynthesizer`]: OpenAI-compatible `/audio/speech`.
//! * [`PiperSynthesizer`]: local `piper` binary reading text on stdin.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::{check_status, http_client, with_auth, ProviderError, SpeechSynthesizer};
use crate::config::TtsConfig;

// ---------------------------------------------------------------------------
// ApiSpeechSynthesizer
// ---------------------------------------------------------------------------

/// Speech from an OpenAI-compatible TTS endpoint.
pub struct ApiSpeechSynthesizer {
    client: reqwest::Client,
    config: TtsConfig,
}

impl ApiSpeechSynthesizer {
    pub fn from_config(config: &TtsConfig) -> Self {
        Self {
            client: http_client(config.timeout_secs),
            config: config.clone(),
        }
    }

    fn request_body(&self, text: &str, voice: &str) -> serde_json::Value {
        let voice = if voice.trim().is_empty() { self.config.voice.as_str() } else { voice };
        serde_json::json!({
            "model": self.config.model,
            "input": text,
            "voice": voice,
            "response_format": self.config.format,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for ApiSpeechSynthesizer {
    fn extension(&self) -> &str {
        &self.config.format
    }

    async fn synthesize(&self, text: &str, output_path: &Path, voice: &str) -> Result<(), ProviderError> {
        let url = format!("{}/audio/speech", self.config.base_url.trim_end_matches('/'));
        log::debug!("speech: POST {url} ({} chars)", text.chars().count());

        let req = self.client.post(&url).json(&self.request_body(text, voice));
        let response = with_auth(req, self.config.api_key.as_deref()).send().await?;
        let response = check_status(response).await?;

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        tokio::fs::write(output_path, &audio).await?;

        log::info!("speech: wrote {} bytes to {}", audio.len(), output_path.display());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PiperSynthesizer
// ---------------------------------------------------------------------------

/// Speech from a local Piper install.
///
/// The voice selects `<piper_model_dir>/<voice>.onnx`; a voice that already
/// ends in `.onnx` is used as a path.
pub struct PiperSynthesizer {
    binary: String,
    model_dir: PathBuf,
    default_voice: String,
}

impl PiperSynthesizer {
    pub fn from_config(config: &TtsConfig) -> Self {
        Self {
            binary: config.piper_binary.clone(),
            model_dir: config.piper_model_dir.clone(),
            default_voice: config.voice.clone(),
        }
    }

    fn model_path(&self, voice: &str) -> PathBuf {
        let voice = if voice.trim().is_empty() { self.default_voice.as_str() } else { voice.trim() };
        if voice.ends_with(".onnx") {
            PathBuf::from(voice)
        } else {
            self.model_dir.join(format!("{voice}.onnx"))
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for PiperSynthesizer {
    fn extension(&self) -> &str {
        "wav"
    }

    async fn synthesize(&self, text: &str, output_path: &Path, voice: &str) -> Result<(), ProviderError> {
        let binary =
            which::which(&self.binary).map_err(|_| ProviderError::ToolNotFound(self.binary.clone()))?;
        let model = self.model_path(voice);
        log::debug!("speech: {} --model {}", binary.display(), model.display());

        let mut child = tokio::process::Command::new(binary)
            .arg("--model")
            .arg(&model)
            .arg("--output_file")
            .arg(output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        // A piper that exits early breaks the pipe; its stderr says why.
        let written = match child.stdin.take() {
            // Dropping stdin closes the pipe so piper starts synthesising.
            Some(mut stdin) => stdin.write_all(text.as_bytes()).await,
            None => Ok(()),
        };

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(ProviderError::ProcessFailed {
                tool: "piper".into(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        written?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
