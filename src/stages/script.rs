//! Script stage.

use super::{is_blank, Stage, Stages};
use crate::error::PipelineError;

impl Stages {
    /// Generate narration for `question` in `language`.
    ///
    /// The collaborator's text is returned verbatim.
    ///
    /// # Errors
    ///
    /// * [`PipelineError::EmptyQuestion`]: `question` is blank.
    /// * [`PipelineError::Generation`]: the generator failed.
    pub async fn script(&self, question: &str, language: &str) -> Result<String, PipelineError> {
        if is_blank(question) {
            return Err(PipelineError::EmptyQuestion);
        }

        log::info!("script: generating ({language}) for {question:?}");
        self.script_gen
            .generate_script(question, language)
            .await
            .map_err(|e| PipelineError::Generation {
                stage: Stage::Script,
                message: e.to_string(),
            })
    }
}
