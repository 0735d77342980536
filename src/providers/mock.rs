//! Test doubles for every collaborator.
//!
//! Each double writes a small real file where the production provider would,
//! so existence checks in the stage wrappers behave as in production.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{
    Collaborators, ImageSynthesizer, ProviderError, RenderRequest, ScriptGenerator,
    SpeechSynthesizer, VideoRenderer,
};

/// Returns `"Script for: <question>"`, or fails for questions containing
/// `fail_on`.
#[derive(Default)]
pub struct MockScript {
    pub fail_on: Option<String>,
    pub calls: Mutex<Vec<String>>,
}

impl MockScript {
    pub fn failing_on(needle: &str) -> Self {
        Self {
            fail_on: Some(needle.into()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ScriptGenerator for MockScript {
    async fn generate_script(&self, question: &str, language: &str) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(format!("{question}|{language}"));
        match &self.fail_on {
            Some(needle) if question.contains(needle.as_str()) => {
                Err(ProviderError::Request("quota exceeded".into()))
            }
            _ => Ok(format!("Script for: {question}")),
        }
    }

    async fn generate_image_prompt(&self, question: &str, _script: &str) -> Result<String, ProviderError> {
        Ok(format!("illustration of {question}"))
    }
}

/// Writes `text` to the output path, or always fails.
pub struct MockSpeech {
    pub fail: bool,
}

impl MockSpeech {
    pub fn ok() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSpeech {
    fn extension(&self) -> &str {
        "wav"
    }

    async fn synthesize(&self, text: &str, output_path: &Path, _voice: &str) -> Result<(), ProviderError> {
        if self.fail {
            return Err(ProviderError::Timeout);
        }
        std::fs::write(output_path, text)?;
        Ok(())
    }
}

/// Writes a placeholder image into `dir`, or always fails.
pub struct MockImage {
    pub dir: PathBuf,
    pub fail: bool,
}

#[async_trait]
impl ImageSynthesizer for MockImage {
    async fn synthesize(
        &self,
        prompt: &str,
        output_name: &str,
        _width: u32,
        _height: u32,
    ) -> Result<PathBuf, ProviderError> {
        if self.fail {
            return Err(ProviderError::Api {
                status: 500,
                message: "CUDA out of memory".into(),
            });
        }
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(output_name);
        std::fs::write(&path, prompt)?;
        Ok(path)
    }
}

/// Records every request and writes an empty video into `dir`; fails for
/// titles containing `fail_on`.
pub struct MockRenderer {
    pub dir: PathBuf,
    pub fail_on: Option<String>,
    pub requests: Mutex<Vec<RenderRequest>>,
}

impl MockRenderer {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            fail_on: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(dir: &Path, needle: &str) -> Self {
        Self {
            fail_on: Some(needle.into()),
            ..Self::new(dir)
        }
    }

    pub fn last_request(&self) -> Option<RenderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl VideoRenderer for MockRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<PathBuf, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(needle) = &self.fail_on {
            if request.title.contains(needle.as_str()) {
                return Err(ProviderError::ProcessFailed {
                    tool: "ffmpeg".into(),
                    status: "exit status: 1".into(),
                    stderr: "Invalid data found when processing input".into(),
                });
            }
        }
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&request.output_name);
        std::fs::write(&path, b"")?;
        Ok(path)
    }
}

/// Collaborators that all succeed, writing into subdirectories of `root`.
pub fn collaborators(root: &Path) -> (Collaborators, Arc<MockRenderer>) {
    let renderer = Arc::new(MockRenderer::new(&root.join("videos")));
    let collab = Collaborators {
        script: Arc::new(MockScript::default()),
        speech: Arc::new(MockSpeech::ok()),
        image: Arc::new(MockImage {
            dir: root.join("images"),
            fail: false,
        }),
        video: renderer.clone(),
    };
    (collab, renderer)
}
