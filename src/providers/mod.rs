//! External collaborators: script text, speech, background images, video.
//!
//! This module provides:
//! * [`ScriptGenerator`], [`SpeechSynthesizer`], [`ImageSynthesizer`],
//!   [`VideoRenderer`]: async traits the stage wrappers call.
//! * [`ChatScriptGenerator`]: OpenAI-compatible chat completions.
//! * [`ApiSpeechSynthesizer`] / [`PiperSynthesizer`]: remote or local TTS.
//! * [`ApiImageSynthesizer`]: OpenAI-compatible image generation.
//! * [`FfmpegRenderer`]: still-image + audio + title muxing via `ffmpeg`.
//! * [`Collaborators`]: one handle to each, built from [`AppConfig`].
//!
//! Providers own any client or model state they need; callers only hold
//! `Arc<dyn …>` handles.

pub mod image;
pub mod script;
pub mod speech;
pub mod video;

#[cfg(test)]
pub mod mock;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{AppConfig, TtsProvider};

pub use image::ApiImageSynthesizer;
pub use script::ChatScriptGenerator;
pub use speech::{ApiSpeechSynthesizer, PiperSynthesizer};
pub use video::{FfmpegRenderer, RenderRequest};

// ---------------------------------------------------------------------------
// ProviderError
// ---------------------------------------------------------------------------

/// Errors raised by any collaborator.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("provider returned an empty response")]
    EmptyResponse,

    /// A required executable is not installed.
    #[error("`{0}` not found on PATH")]
    ToolNotFound(String),

    /// An external process exited unsuccessfully.
    #[error("{tool} failed ({status}): {stderr}")]
    ProcessFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Request(e.to_string())
        }
    }
}

/// Turn a non-success HTTP response into [`ProviderError::Api`], pulling
/// `error.message` out of a JSON body when there is one.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Api {
        status: status.as_u16(),
        message: api_error_message(&body),
    })
}

fn api_error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let message = parsed.as_ref().and_then(|json| {
        // OpenAI: {"error": {"message": …}}; Gemini's compat layer wraps
        // the same shape in a one-element array.
        let err = if json.is_array() { &json[0]["error"] } else { &json["error"] };
        err["message"].as_str().or_else(|| err.as_str())
    });
    match message {
        Some(m) => m.to_string(),
        None if body.trim().is_empty() => "no error details".to_string(),
        None => body.trim().to_string(),
    }
}

/// Build a `reqwest::Client` with a per-request timeout.
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Attach a bearer token when `api_key` is a non-empty string.
pub(crate) fn with_auth(req: reqwest::RequestBuilder, api_key: Option<&str>) -> reqwest::RequestBuilder {
    match api_key.map(str::trim) {
        Some(key) if !key.is_empty() => req.bearer_auth(key),
        _ => req,
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Writes narration scripts and image prompts.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    /// Narration text answering `question`, written in `language`.
    async fn generate_script(&self, question: &str, language: &str) -> Result<String, ProviderError>;

    /// A short prompt for a background illustration of the answer.
    async fn generate_image_prompt(&self, question: &str, script: &str) -> Result<String, ProviderError>;
}

/// Turns text into an audio file.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// File extension (without dot) of the audio this synthesizer writes.
    fn extension(&self) -> &str;

    /// Speak `text` with `voice`, writing the audio to `output_path`.
    async fn synthesize(&self, text: &str, output_path: &Path, voice: &str) -> Result<(), ProviderError>;
}

/// Renders a background image for a prompt.
#[async_trait]
pub trait ImageSynthesizer: Send + Sync {
    /// Generate an image and return the path it was written to.
    async fn synthesize(
        &self,
        prompt: &str,
        output_name: &str,
        width: u32,
        height: u32,
    ) -> Result<PathBuf, ProviderError>;
}

/// Muxes narration audio, a background and a title into a video.
#[async_trait]
pub trait VideoRenderer: Send + Sync {
    /// Render `request` and return the path of the finished video.
    async fn render(&self, request: &RenderRequest) -> Result<PathBuf, ProviderError>;
}

// Compile-time assertion: every trait must be usable as a trait object.
const _: fn() = || {
    fn _assert_object_safe(
        _: Arc<dyn ScriptGenerator>,
        _: Arc<dyn SpeechSynthesizer>,
        _: Arc<dyn ImageSynthesizer>,
        _: Arc<dyn VideoRenderer>,
    ) {
    }
};

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// One handle to each collaborator.
#[derive(Clone)]
pub struct Collaborators {
    pub script: Arc<dyn ScriptGenerator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub image: Arc<dyn ImageSynthesizer>,
    pub video: Arc<dyn VideoRenderer>,
}

impl Collaborators {
    /// Build the production collaborators selected by `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        let speech: Arc<dyn SpeechSynthesizer> = match config.tts.provider {
            TtsProvider::OpenAiCompatible => Arc::new(ApiSpeechSynthesizer::from_config(&config.tts)),
            TtsProvider::Piper => Arc::new(PiperSynthesizer::from_config(&config.tts)),
        };

        Self {
            script: Arc::new(ChatScriptGenerator::from_config(&config.llm)),
            speech,
            image: Arc::new(ApiImageSynthesizer::from_config(
                &config.image,
                &config.output.image_dir,
            )),
            video: Arc::new(FfmpegRenderer::from_config(&config.video, &config.output.video_dir)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_message_reads_openai_shape() {
        let body = r#"{"error": {"message": "Invalid API key", "type": "auth"}}"#;
        assert_eq!(api_error_message(body), "Invalid API key");
    }

    #[test]
    fn api_error_message_reads_array_shape() {
        let body = r#"[{"error": {"code": 400, "message": "API key not valid"}}]"#;
        assert_eq!(api_error_message(body), "API key not valid");
    }

    #[test]
    fn api_error_message_falls_back_to_body() {
        assert_eq!(api_error_message("  bad gateway \n"), "bad gateway");
        assert_eq!(api_error_message(""), "no error details");
    }

    #[test]
    fn from_config_builds_every_provider() {
        let mut config = AppConfig::default();
        let _ = Collaborators::from_config(&config);
        config.tts.provider = TtsProvider::Piper;
        let collab = Collaborators::from_config(&config);
        assert_eq!(collab.speech.extension(), "wav");
    }
}
