//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and handed to each
//! provider at construction time.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::format::ParseMode;

// ---------------------------------------------------------------------------
// LlmConfig
// ---------------------------------------------------------------------------

/// Settings for the script / image-prompt generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API, including the version segment.
    ///
    /// `/chat/completions` is appended to it.
    pub base_url: String,
    /// API key.  When `None` or empty, [`api_key_env`](Self::api_key_env) is
    /// consulted by [`AppConfig::resolve_secrets`].
    pub api_key: Option<String>,
    /// Environment variable that holds the API key.
    pub api_key_env: String,
    /// Model identifier sent to the API.
    pub model: String,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f32,
    /// Maximum seconds to wait for a response.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".into(),
            api_key: None,
            api_key_env: "GEMINI_API_KEY".into(),
            model: "gemini-2.5-flash".into(),
            temperature: 0.7,
            timeout_secs: 120,
        }
    }
}

// ---------------------------------------------------------------------------
// TtsProvider / TtsConfig
// ---------------------------------------------------------------------------

/// Selects which speech backend narrates the script.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TtsProvider {
    /// Any OpenAI-compatible `/audio/speech` endpoint.
    OpenAiCompatible,
    /// A local `piper` binary; the voice names an `.onnx` model file.
    Piper,
}

impl Default for TtsProvider {
    fn default() -> Self {
        Self::OpenAiCompatible
    }
}

/// Settings for speech synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub provider: TtsProvider,
    /// Base URL for [`TtsProvider::OpenAiCompatible`]; `/audio/speech` is
    /// appended.
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub model: String,
    /// Voice used when the caller does not pick one.
    pub voice: String,
    /// Audio container requested from the API (`mp3`, `wav`, ...).
    pub format: String,
    /// Path or name of the `piper` executable.
    pub piper_binary: String,
    /// Directory holding `<voice>.onnx` models for Piper.
    pub piper_model_dir: PathBuf,
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: TtsProvider::default(),
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            api_key_env: "OPENAI_API_KEY".into(),
            model: "gpt-4o-mini-tts".into(),
            voice: "alloy".into(),
            format: "mp3".into(),
            piper_binary: "piper".into(),
            piper_model_dir: PathBuf::from("assets/voices"),
            timeout_secs: 180,
        }
    }
}

// ---------------------------------------------------------------------------
// ImageConfig
// ---------------------------------------------------------------------------

/// Settings for background image synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Generate a background for every task.  Off by default: diffusion is
    /// slow and expensive, and a default background always exists.
    pub enabled: bool,
    /// Base URL; `/images/generations` is appended.
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub model: String,
    /// Appended to every generated prompt.
    pub style_suffix: String,
    /// Size sent to the endpoint, e.g. `"1792x1024"`. Empty picks the
    /// `dall-e-3` size closest to the frame's aspect ratio.
    pub size: String,
    pub timeout_secs: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            api_key_env: "OPENAI_API_KEY".into(),
            model: "dall-e-3".into(),
            style_suffix: "cinematic, beautiful, high-res, detailed".into(),
            size: String::new(),
            timeout_secs: 300,
        }
    }
}

// ---------------------------------------------------------------------------
// VideoConfig
// ---------------------------------------------------------------------------

/// Frame, font and encoder settings for the video stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub font_size: u32,
    /// Either an ffmpeg color token or a browser `rgba(...)` string.
    pub font_color: String,
    /// TrueType font used by `drawtext`.  Must cover the script's glyphs.
    pub font_path: PathBuf,
    /// Background used when a task has no existing image of its own.
    pub default_background: PathBuf,
    pub ffmpeg_binary: String,
    pub audio_bitrate: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            font_size: 40,
            font_color: "white".into(),
            font_path: PathBuf::from("assets/fonts/NotoSansTC-Regular.ttf"),
            default_background: PathBuf::from("assets/images/bg_default.jpg"),
            ffmpeg_binary: "ffmpeg".into(),
            audio_bitrate: "192k".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// OutputConfig
// ---------------------------------------------------------------------------

/// Where generated artifacts are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub video_dir: PathBuf,
    pub audio_dir: PathBuf,
    pub image_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            video_dir: PathBuf::from("assets/videos"),
            audio_dir: PathBuf::from("assets/audio"),
            image_dir: PathBuf::from("assets/images"),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Orchestration behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Language the narration script is written in.
    pub language: String,
    /// How free-text question lists are split.
    pub question_mode: ParseMode,
    /// Clear downstream artifacts of a task when an upstream stage is re-run.
    ///
    /// Off by default: the store keeps whatever each stage last wrote.
    pub invalidate_downstream: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            language: "English".into(),
            question_mode: ParseMode::Blocks,
            invalidate_downstream: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use qa_video::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let mut config = AppConfig::load().unwrap();
/// config.resolve_secrets();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub tts: TtsConfig,
    pub image: ImageConfig,
    pub video: VideoConfig,
    pub output: OutputConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Fill every empty `api_key` from its `api_key_env` variable.
    ///
    /// Keys written in the settings file win over the environment.
    pub fn resolve_secrets(&mut self) {
        self.resolve_secrets_with(|name| std::env::var(name).ok());
    }

    fn resolve_secrets_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fill_key(&mut self.llm.api_key, &self.llm.api_key_env, &lookup);
        fill_key(&mut self.tts.api_key, &self.tts.api_key_env, &lookup);
        fill_key(&mut self.image.api_key, &self.image.api_key_env, &lookup);
    }
}

fn fill_key(key: &mut Option<String>, env: &str, lookup: &impl Fn(&str) -> Option<String>) {
    let missing = key.as_deref().map_or(true, |k| k.trim().is_empty());
    if missing {
        *key = lookup(env).filter(|v| !v.trim().is_empty());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
