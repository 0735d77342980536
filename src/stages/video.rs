//! Video stage.

use std::path::{Path, PathBuf};

use super::{is_blank, Stages};
use crate::error::PipelineError;
use crate::format::to_ffmpeg_color;
use crate::providers::RenderRequest;

/// Inputs for [`Stages::video`] as the user supplied them.
#[derive(Debug, Clone)]
pub struct VideoInput<'a> {
    pub question: &'a str,
    /// Overrides the question as on-screen title when non-blank.
    pub title: Option<&'a str>,
    pub audio_path: Option<&'a Path>,
    /// Used when it exists on disk; otherwise the configured default.
    pub background: Option<&'a Path>,
    pub output_name: &'a str,
    pub width: u32,
    pub height: u32,
    pub font_size: u32,
    /// Color picker value; `rgba(...)` is converted for ffmpeg.
    pub font_color: &'a str,
}

impl Stages {
    /// Resolve title, background and color, then render the video.
    ///
    /// # Errors
    ///
    /// * [`PipelineError::MissingAudio`]: no audio path, or it is not on disk.
    /// * [`PipelineError::MissingTitle`]: title and question both blank.
    /// * [`PipelineError::MissingBackground`]: neither background exists.
    /// * [`PipelineError::Encoding`]: the renderer failed.
    pub async fn video(&self, input: VideoInput<'_>) -> Result<PathBuf, PipelineError> {
        let audio_path = match input.audio_path {
            Some(path) if path.exists() => path,
            Some(path) => return Err(PipelineError::MissingAudio(path.display().to_string())),
            None => return Err(PipelineError::MissingAudio("none recorded".into())),
        };

        let title = match input.title {
            Some(t) if !is_blank(t) => t,
            _ if !is_blank(input.question) => input.question,
            _ => return Err(PipelineError::MissingTitle),
        };

        let background = self.resolve_background(input.background)?;

        let request = RenderRequest {
            audio_path: audio_path.to_path_buf(),
            title: title.trim().to_string(),
            output_name: input.output_name.to_string(),
            background_path: background,
            width: input.width,
            height: input.height,
            font_size: input.font_size,
            font_color: to_ffmpeg_color(input.font_color),
        };

        log::info!(
            "video: rendering {} ({}x{}, title {:?})",
            request.output_name,
            request.width,
            request.height,
            request.title
        );
        self.renderer
            .render(&request)
            .await
            .map_err(|e| PipelineError::Encoding(e.to_string()))
    }

    fn resolve_background(&self, supplied: Option<&Path>) -> Result<PathBuf, PipelineError> {
        if let Some(path) = supplied {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            log::warn!(
                "video: background {} not found, using default {}",
                path.display(),
                self.default_background.display()
            );
        }
        if self.default_background.exists() {
            Ok(self.default_background.clone())
        } else {
            Err(PipelineError::MissingBackground(
                self.default_background.display().to_string(),
            ))
        }
    }
}
