//! Image stage.

use std::path::PathBuf;

use super::{is_blank, Stage, Stages};
use crate::error::PipelineError;

/// Appended to every image-stage failure.
pub const IMAGE_STAGE_HINT: &str = "Image generation is resource-intensive and can fail on \
     constrained hardware or quotas; retry, upload a background image, or disable image generation.";

impl Stages {
    /// Derive an image prompt from `question` and `script`, then render a
    /// `width`×`height` background to `bg_<stem>.png`.
    ///
    /// Returns `(prompt, image_path)`.
    ///
    /// # Errors
    ///
    /// * [`PipelineError::EmptyScript`] / [`PipelineError::EmptyQuestion`].
    /// * [`PipelineError::Generation`]: either the prompt or the image
    ///   failed; the message ends with [`IMAGE_STAGE_HINT`].
    pub async fn image(
        &self,
        question: &str,
        script: &str,
        width: u32,
        height: u32,
        stem: &str,
    ) -> Result<(String, PathBuf), PipelineError> {
        if is_blank(script) {
            return Err(PipelineError::EmptyScript);
        }
        if is_blank(question) {
            return Err(PipelineError::EmptyQuestion);
        }

        let prompt = self
            .script_gen
            .generate_image_prompt(question, script)
            .await
            .map_err(|e| image_failure(format!("could not derive an image prompt: {e}")))?;

        let output_name = format!("bg_{stem}.png");
        log::info!("image: {prompt:?} → {output_name}");

        let path = self
            .image_gen
            .synthesize(&prompt, &output_name, width, height)
            .await
            .map_err(|e| image_failure(e.to_string()))?;

        Ok((prompt, path))
    }
}

fn image_failure(cause: String) -> PipelineError {
    PipelineError::Generation {
        stage: Stage::Image,
        message: format!("{cause}. {IMAGE_STAGE_HINT}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::providers::mock::{collaborators, MockImage};
    use crate::stages::{test_config, Stages};

    use super::*;

    #[tokio::test]
    async fn returns_prompt_and_path() {
        let dir = tempfile::tempdir().unwrap();
        let (collab, _) = collaborators(dir.path());
        let stages = Stages::new(collab, &test_config(dir.path()));

        let (prompt, path) = stages
            .image("What is RAM?", "RAM is...", 1280, 720, "What_is_RAM_2")
            .await
            .unwrap();
        assert_eq!(prompt, "illustration of What is RAM?");
        assert_eq!(path.file_name().unwrap(), "bg_What_is_RAM_2.png");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn empty_inputs_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (collab, _) = collaborators(dir.path());
        let stages = Stages::new(collab, &test_config(dir.path()));

        let err = stages.image("q", "", 640, 360, "q").await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyScript));
        let err = stages.image(" ", "script", 640, 360, "q").await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyQuestion));
    }

    #[tokio::test]
    async fn failure_carries_resource_guidance() {
        let dir = tempfile::tempdir().unwrap();
        let (mut collab, _) = collaborators(dir.path());
        collab.image = Arc::new(MockImage {
            dir: dir.path().join("images"),
            fail: true,
        });
        let stages = Stages::new(collab, &test_config(dir.path()));

        let err = stages.image("q", "s", 640, 360, "q").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("CUDA out of memory"));
        assert!(message.ends_with(IMAGE_STAGE_HINT));
    }
}
