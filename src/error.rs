//! User-facing pipeline errors.
//!
//! Every variant renders a message that can be shown as-is; collaborator
//! failures carry the provider's own error text.

use thiserror::Error;

use crate::stages::Stage;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The question list contained nothing after parsing.
    #[error("no questions found; enter at least one question")]
    EmptyInput,

    #[error("the question is empty")]
    EmptyQuestion,

    #[error("the script is empty; generate or enter a script first")]
    EmptyScript,

    /// No audio path recorded, or the file is gone.
    #[error("no audio available for the video ({0}); generate audio first")]
    MissingAudio(String),

    #[error("the video title is empty and there is no question to fall back on")]
    MissingTitle,

    /// Neither the task's background nor the configured default exists.
    #[error("no background image found (default: {0})")]
    MissingBackground(String),

    /// A script, audio or image collaborator failed.
    #[error("{stage} generation failed: {message}")]
    Generation { stage: Stage, message: String },

    /// The video tool failed or exited with a non-zero status.
    #[error("video encoding failed: {0}")]
    Encoding(String),

    /// A per-stage operation named a question that is not in the store.
    #[error("no task for question {0:?}")]
    UnknownTask(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_message_names_stage_and_cause() {
        let err = PipelineError::Generation {
            stage: Stage::Audio,
            message: "HTTP request failed: connection refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "audio generation failed: HTTP request failed: connection refused"
        );
    }

    #[test]
    fn encoding_message_includes_cause() {
        let err = PipelineError::Encoding("ffmpeg exited with status 1".into());
        assert!(err.to_string().contains("exited with status 1"));
    }
}
