//! `FfmpegRenderer`: a still background, narration audio and a centred
//! title muxed into an H.264/AAC video.
//!
//! # Command shape
//!
//! ```text
//! ffmpeg -y -v error -loop 1 -i <background> -i <audio>
//!        -vf scale=W:H:force_original_aspect_ratio=decrease,
//!            pad=W:H:(ow-iw)/2:(oh-ih)/2,setsar=1,
//!            drawtext=fontfile=…:textfile=…:expansion=none:fontcolor=…:fontsize=…:x=…:y=…
//!        -r <fps> -c:v libx264 -tune stillimage -c:a aac -b:a <bitrate>
//!        -pix_fmt yuv420p -shortest <output>
//! ```
//!
//! The title goes through `textfile=` rather than `text=` so that quotes,
//! colons and `%` in a question never need filtergraph escaping.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;

use super::{ProviderError, VideoRenderer};
use crate::config::VideoConfig;

// ---------------------------------------------------------------------------
// RenderRequest
// ---------------------------------------------------------------------------

/// Everything the renderer needs for one video.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub audio_path: PathBuf,
    pub title: String,
    /// File name (not path) of the video inside the output directory.
    pub output_name: String,
    pub background_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub font_size: u32,
    /// Already in ffmpeg form (`white`, `#rrggbb`, `0xrrggbbaa`).
    pub font_color: String,
}

// ---------------------------------------------------------------------------
// FfmpegRenderer
// ---------------------------------------------------------------------------

pub struct FfmpegRenderer {
    config: VideoConfig,
    video_dir: PathBuf,
}

impl FfmpegRenderer {
    /// Videos are written into `video_dir`.
    pub fn from_config(config: &VideoConfig, video_dir: &Path) -> Self {
        Self {
            config: config.clone(),
            video_dir: video_dir.to_path_buf(),
        }
    }

    /// Output path for `output_name`, adding `.mp4` when it has no extension.
    fn output_path(&self, output_name: &str) -> PathBuf {
        let mut path = self.video_dir.join(output_name);
        if path.extension().is_none() {
            path.set_extension("mp4");
        }
        path
    }

    fn filter_graph(&self, request: &RenderRequest, title_file: &Path) -> String {
        let (w, h) = (request.width, request.height);
        let mut drawtext = String::from("drawtext=");
        if self.config.font_path.exists() {
            drawtext.push_str(&format!("fontfile={}:", filter_path(&self.config.font_path)));
        } else {
            log::warn!(
                "video: font {} not found, using fontconfig default",
                self.config.font_path.display()
            );
        }
        drawtext.push_str(&format!(
            "textfile={}:expansion=none:fontcolor={}:fontsize={}:x=(w-text_w)/2:y=(h-text_h)/2",
            filter_path(title_file),
            request.font_color,
            request.font_size,
        ));

        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,{drawtext}"
        )
    }

    /// Full ffmpeg argument list (without the binary).
    fn build_args(&self, request: &RenderRequest, title_file: &Path, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = vec!["-y".into(), "-v".into(), "error".into()];
        args.extend(["-loop".into(), "1".into(), "-i".into()]);
        args.push(request.background_path.to_string_lossy().into_owned());
        args.push("-i".into());
        args.push(request.audio_path.to_string_lossy().into_owned());
        args.push("-vf".into());
        args.push(self.filter_graph(request, title_file));
        args.extend([
            "-r".into(),
            self.config.fps.to_string(),
            "-c:v".into(),
            "libx264".into(),
            "-tune".into(),
            "stillimage".into(),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            self.config.audio_bitrate.clone(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-shortest".into(),
        ]);
        args.push(output.to_string_lossy().into_owned());
        args
    }
}

/// Quote a path for use as a filter option value.
///
/// Backslashes become forward slashes (ffmpeg accepts both on Windows),
/// `:` is escaped for the option parser and the value is single-quoted for
/// the graph parser.
fn filter_path(path: &Path) -> String {
    let s = path
        .to_string_lossy()
        .replace('\\', "/")
        .replace('\'', r"'\''")
        .replace(':', r"\:");
    format!("'{s}'")
}

#[async_trait]
impl VideoRenderer for FfmpegRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<PathBuf, ProviderError> {
        let binary = which::which(&self.config.ffmpeg_binary)
            .map_err(|_| ProviderError::ToolNotFound(self.config.ffmpeg_binary.clone()))?;

        tokio::fs::create_dir_all(&self.video_dir).await?;
        let output = self.output_path(&request.output_name);
        let title_file = output.with_extension("title.txt");
        tokio::fs::write(&title_file, &request.title).await?;

        let args = self.build_args(request, &title_file, &output);
        log::debug!("video: {} {}", binary.display(), args.join(" "));

        let result = tokio::process::Command::new(&binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        if let Err(e) = tokio::fs::remove_file(&title_file).await {
            log::debug!("video: could not remove {}: {e}", title_file.display());
        }

        let result = result?;
        if !result.status.success() {
            return Err(ProviderError::ProcessFailed {
                tool: "ffmpeg".into(),
                status: result.status.to_string(),
                stderr: tail(&String::from_utf8_lossy(&result.stderr), 20),
            });
        }

        log::info!("video: rendered {}", output.display());
        Ok(output)
    }
}

/// Last `n` lines of `text`.
fn tail(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim().lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
