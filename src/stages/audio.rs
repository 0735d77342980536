//! Audio stage.

use std::path::PathBuf;

use super::{is_blank, Stage, Stages};
use crate::error::PipelineError;

impl Stages {
    /// Narrate `script` with `voice` into a fresh file in the audio directory.
    ///
    /// File names are timestamps (`speech_20250101_120000_123456.mp3`): they
    /// never collide across re-runs and never contain non-ASCII characters.
    ///
    /// # Errors
    ///
    /// * [`PipelineError::EmptyScript`]: `script` is blank.
    /// * [`PipelineError::Io`]: the audio directory cannot be created.
    /// * [`PipelineError::Generation`]: the synthesizer failed.
    pub async fn audio(&self, script: &str, voice: &str) -> Result<PathBuf, PipelineError> {
        if is_blank(script) {
            return Err(PipelineError::EmptyScript);
        }

        tokio::fs::create_dir_all(&self.audio_dir).await?;
        let output = self.audio_dir.join(format!(
            "speech_{}.{}",
            chrono::Local::now().format("%Y%m%d_%H%M%S_%6f"),
            self.speech.extension()
        ));

        log::info!("audio: synthesising with voice {voice:?} → {}", output.display());
        self.speech
            .synthesize(script, &output, voice)
            .await
            .map_err(|e| PipelineError::Generation {
                stage: Stage::Audio,
                message: e.to_string(),
            })?;
        Ok(output)
    }
}
