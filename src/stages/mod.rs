//! Stage wrappers.
//!
//! One async method per stage on [`Stages`]: each checks its preconditions,
//! calls the matching collaborator and turns any failure into a
//! [`PipelineError`](crate::error::PipelineError) a user can read.
//!
//! ```text
//! script(question, language)            → String
//! audio(script, voice)                  → PathBuf
//! image(question, script, w, h)         → (prompt, PathBuf)
//! video(VideoInput)                     → PathBuf
//! ```
//!
//! The wrappers never touch the task store; the runners in
//! [`crate::pipeline`] decide what to record.

pub mod audio;
pub mod image;
pub mod script;
pub mod video;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::providers::{
    Collaborators, ImageSynthesizer, ScriptGenerator, SpeechSynthesizer, VideoRenderer,
};

pub use image::IMAGE_STAGE_HINT;
pub use video::VideoInput;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// The four generation steps, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Script,
    Audio,
    Image,
    Video,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Script => "script",
            Stage::Audio => "audio",
            Stage::Image => "image",
            Stage::Video => "video",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// The collaborators plus the directories and fallbacks the wrappers need.
pub struct Stages {
    script_gen: Arc<dyn ScriptGenerator>,
    speech: Arc<dyn SpeechSynthesizer>,
    image_gen: Arc<dyn ImageSynthesizer>,
    renderer: Arc<dyn VideoRenderer>,
    audio_dir: PathBuf,
    default_background: PathBuf,
}

impl Stages {
    pub fn new(collaborators: Collaborators, config: &AppConfig) -> Self {
        Self {
            script_gen: collaborators.script,
            speech: collaborators.speech,
            image_gen: collaborators.image,
            renderer: collaborators.video,
            audio_dir: config.output.audio_dir.clone(),
            default_background: config.video.default_background.clone(),
        }
    }
}

/// `true` when `text` is absent or whitespace-only.
pub(crate) fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

/// Config rooted in `root`, with a default background that exists.
#[cfg(test)]
pub(crate) fn test_config(root: &std::path::Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.output.audio_dir = root.join("audio");
    config.output.image_dir = root.join("images");
    config.output.video_dir = root.join("videos");
    config.video.default_background = root.join("default_bg.jpg");
    std::fs::write(&config.video.default_background, b"jpg").expect("write default background");
    config
}
