//! Pipeline orchestrator: per-stage operations, single-task and batch runs.
//!
//! [`PipelineOrchestrator`] owns the [`Stages`] and the [`TaskStore`]. Every
//! operation awaits its collaborator before returning and records each
//! artifact in the store the moment its stage succeeds, so a failure later in
//! the chain never loses earlier results.
//!
//! # Pipeline flow
//!
//! ```text
//! run_task(question)
//!   ├─ generate_script          → task.script
//!   ├─ generate_audio           → task.audio_path
//!   ├─ generate_image | skip    → task.image_prompt, task.background_image_path
//!   └─ render_video             → task.video_path
//!
//! run_batch()
//!   └─ for each task in store order: run_task, record status, keep going
//! ```

use std::path::PathBuf;

use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::format::{parse_questions, ParseMode};
use crate::providers::Collaborators;
use crate::stages::{Stage, Stages, VideoInput};

use super::state::{Task, TaskStatus, TaskStore, IMAGE_SKIPPED_PROMPT};

// ---------------------------------------------------------------------------
// TaskOptions
// ---------------------------------------------------------------------------

/// User-selected parameters for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOptions {
    pub language: String,
    pub voice: String,
    /// Generate a background with the image stage when no `background` is
    /// supplied.
    pub generate_image: bool,
    /// On-screen title; the question is used when `None` or blank.
    pub title: Option<String>,
    /// User-supplied background image.
    pub background: Option<PathBuf>,
    /// Output file name; `<task file stem>.mp4` when `None`.
    pub output_name: Option<String>,
    pub width: u32,
    pub height: u32,
    pub font_size: u32,
    /// Named color, `#rrggbb`, or `rgba(r, g, b, a)`.
    pub font_color: String,
}

impl TaskOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            language: config.pipeline.language.clone(),
            voice: config.tts.voice.clone(),
            generate_image: config.image.enabled,
            title: None,
            background: None,
            output_name: None,
            width: config.video.width,
            height: config.video.height,
            font_size: config.video.font_size,
            font_color: config.video.font_color.clone(),
        }
    }

    /// The explicit output name, or `<stem>.mp4`.
    fn output_name_or(&self, stem: &str) -> String {
        match &self.output_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => format!("{stem}.mp4"),
        }
    }
}

// ---------------------------------------------------------------------------
// Batch reporting
// ---------------------------------------------------------------------------

/// Passed to the progress callback after each task finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress<'a> {
    pub completed: usize,
    pub total: usize,
    pub question: &'a str,
}

/// Outcome of [`PipelineOrchestrator::run_batch`].
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Videos produced, in store order.
    pub videos: Vec<PathBuf>,
    /// One entry per failed task, naming the question and the error.
    pub warnings: Vec<String>,
    /// Snapshot of the last task processed.
    pub last: Option<Task>,
}

// ---------------------------------------------------------------------------
// PipelineOrchestrator
// ---------------------------------------------------------------------------

pub struct PipelineOrchestrator {
    stages: Stages,
    store: TaskStore,
    defaults: TaskOptions,
    invalidate_downstream: bool,
}

impl PipelineOrchestrator {
    pub fn new(collaborators: Collaborators, config: &AppConfig) -> Self {
        Self {
            stages: Stages::new(collaborators, config),
            store: TaskStore::new(),
            defaults: TaskOptions::from_config(config),
            invalidate_downstream: config.pipeline.invalidate_downstream,
        }
    }

    /// Orchestrator wired to the production collaborators.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(Collaborators::from_config(config), config)
    }

    /// Options built from the configuration this orchestrator was created with.
    pub fn default_options(&self) -> &TaskOptions {
        &self.defaults
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TaskStore {
        &mut self.store
    }

    // -----------------------------------------------------------------------
    // Per-stage operations
    // -----------------------------------------------------------------------

    /// Generate and record a script, creating the task if needed.
    pub async fn generate_script(
        &mut self,
        question: &str,
        language: &str,
    ) -> Result<String, PipelineError> {
        let script = self.stages.script(question, language).await?;
        let invalidate = self.invalidate_downstream;
        let task = self.store.entry_or_insert(question);
        task.script = Some(script.clone());
        if invalidate {
            task.invalidate_after(Stage::Script);
        }
        Ok(script)
    }

    /// Record a user-edited script.
    pub fn set_script(&mut self, question: &str, script: &str) -> Result<(), PipelineError> {
        if question.trim().is_empty() {
            return Err(PipelineError::EmptyQuestion);
        }
        let invalidate = self.invalidate_downstream;
        let task = self.store.entry_or_insert(question);
        task.script = Some(script.to_string());
        if invalidate {
            task.invalidate_after(Stage::Script);
        }
        Ok(())
    }

    /// Narrate the task's current script.
    pub async fn generate_audio(&mut self, question: &str, voice: &str) -> Result<PathBuf, PipelineError> {
        let script = self.task(question)?.script.clone().unwrap_or_default();
        let path = self.stages.audio(&script, voice).await?;

        let invalidate = self.invalidate_downstream;
        let task = self.task_mut(question)?;
        task.audio_path = Some(path.clone());
        if invalidate {
            task.invalidate_after(Stage::Audio);
        }
        Ok(path)
    }

    /// Generate a background image from the task's question and script.
    pub async fn generate_image(
        &mut self,
        question: &str,
        width: u32,
        height: u32,
    ) -> Result<PathBuf, PipelineError> {
        let script = self.task(question)?.script.clone().unwrap_or_default();
        let stem = self.file_stem(question)?;
        let (prompt, path) = self
            .stages
            .image(question, &script, width, height, &stem)
            .await?;

        let invalidate = self.invalidate_downstream;
        let task = self.task_mut(question)?;
        task.image_prompt = Some(prompt);
        task.background_image_path = Some(path.clone());
        task.generated_background = true;
        if invalidate {
            task.invalidate_after(Stage::Image);
        }
        Ok(path)
    }

    /// Record a user-supplied background, or clear it with `None`.
    pub fn set_background(&mut self, question: &str, path: Option<PathBuf>) -> Result<(), PipelineError> {
        let invalidate = self.invalidate_downstream;
        let task = self.task_mut(question)?;
        task.background_image_path = path;
        task.generated_background = false;
        if invalidate {
            task.invalidate_after(Stage::Image);
        }
        Ok(())
    }

    /// Render the task's audio and background into a video.
    pub async fn render_video(&mut self, question: &str, opts: &TaskOptions) -> Result<PathBuf, PipelineError> {
        let task = self.task(question)?.clone();
        let output_name = opts.output_name_or(&self.file_stem(question)?);
        let input = VideoInput {
            question,
            title: opts.title.as_deref(),
            audio_path: task.audio_path.as_deref(),
            background: task.background_image_path.as_deref(),
            output_name: &output_name,
            width: opts.width,
            height: opts.height,
            font_size: opts.font_size,
            font_color: &opts.font_color,
        };
        let path = self.stages.video(input).await?;

        self.task_mut(question)?.video_path = Some(path.clone());
        Ok(path)
    }

    // -----------------------------------------------------------------------
    // Runners
    // -----------------------------------------------------------------------

    /// Run every stage for `question`, stopping at the first failure.
    ///
    /// The task's status ends as `Succeeded` or `Failed(message)`.
    pub async fn run_task(&mut self, question: &str, opts: &TaskOptions) -> Result<PathBuf, PipelineError> {
        if question.trim().is_empty() {
            return Err(PipelineError::EmptyQuestion);
        }
        self.store.entry_or_insert(question).status = TaskStatus::Running;

        let result = self.run_stages(question, opts).await;

        let task = self.store.entry_or_insert(question);
        task.status = match &result {
            Ok(_) => TaskStatus::Succeeded,
            Err(e) => TaskStatus::Failed(e.to_string()),
        };
        result
    }

    async fn run_stages(&mut self, question: &str, opts: &TaskOptions) -> Result<PathBuf, PipelineError> {
        log::info!("pipeline: starting {question:?}");
        self.generate_script(question, &opts.language).await?;
        self.generate_audio(question, &opts.voice).await?;

        if let Some(bg) = &opts.background {
            self.set_background(question, Some(bg.clone()))?;
        }

        let task = self.task(question)?;
        let has_user_background = task.background_image_path.is_some() && !task.generated_background;

        if opts.generate_image && !has_user_background {
            self.generate_image(question, opts.width, opts.height).await?;
        } else {
            log::info!("pipeline: image generation skipped for {question:?}");
            self.task_mut(question)?.image_prompt = Some(IMAGE_SKIPPED_PROMPT.to_string());
        }

        let path = self.render_video(question, opts).await?;
        log::info!("pipeline: finished {question:?} → {}", path.display());
        Ok(path)
    }

    /// Run every task in the store, in order, continuing past failures.
    ///
    /// `opts.title` and `opts.output_name` are ignored so each video gets its
    /// own question as title and its own file name.
    pub async fn run_batch<F>(&mut self, opts: &TaskOptions, mut progress: F) -> BatchReport
    where
        F: FnMut(&BatchProgress<'_>),
    {
        for task in self.store.iter_mut() {
            task.status = TaskStatus::Pending;
        }

        let per_task = TaskOptions {
            title: None,
            output_name: None,
            ..opts.clone()
        };
        let questions = self.store.questions();
        let total = questions.len();
        let mut report = BatchReport::default();

        for (i, question) in questions.iter().enumerate() {
            match self.run_task(question, &per_task).await {
                Ok(path) => report.videos.push(path),
                Err(e) => {
                    log::warn!("batch: {question:?} failed: {e}");
                    report.warnings.push(format!("{question}: {e}"));
                }
            }
            progress(&BatchProgress {
                completed: i + 1,
                total,
                question,
            });
            report.last = self.store.get(question).cloned();
        }

        log::info!(
            "batch: {} of {total} videos produced, {} failed",
            report.videos.len(),
            report.warnings.len()
        );
        report
    }

    /// Parse `text` into questions, replace the store with them and run the
    /// batch.
    ///
    /// # Errors
    ///
    /// [`PipelineError::EmptyInput`] when `text` holds no questions; the
    /// store is left untouched in that case.
    pub async fn run_batch_text<F>(
        &mut self,
        text: &str,
        mode: ParseMode,
        opts: &TaskOptions,
        progress: F,
    ) -> Result<BatchReport, PipelineError>
    where
        F: FnMut(&BatchProgress<'_>),
    {
        let questions = parse_questions(text, mode)?;
        self.store.replace_with_questions(questions);
        Ok(self.run_batch(opts, progress).await)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn file_stem(&self, question: &str) -> Result<String, PipelineError> {
        self.store
            .file_stem(question)
            .ok_or_else(|| PipelineError::UnknownTask(question.to_string()))
    }

    fn task(&self, question: &str) -> Result<&Task, PipelineError> {
        self.store
            .get(question)
            .ok_or_else(|| PipelineError::UnknownTask(question.to_string()))
    }

    fn task_mut(&mut self, question: &str) -> Result<&mut Task, PipelineError> {
        self.store
            .get_mut(question)
            .ok_or_else(|| PipelineError::UnknownTask(question.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::providers::mock::{collaborators, MockImage, MockRenderer, MockSpeech};
    use crate::stages::test_config;

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn orchestrator(root: &Path, config: &AppConfig) -> (PipelineOrchestrator, Arc<MockRenderer>) {
        let (collab, renderer) = collaborators(root);
        (PipelineOrchestrator::new(collab, config), renderer)
    }

    const THREE: &str = "1. What is RAM?\n\n2. What is a CPU?\n\n3. What is a GPU?";

    // -----------------------------------------------------------------------
    // run_task
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn run_task_records_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let (mut orc, renderer) = orchestrator(dir.path(), &config);
        let opts = orc.default_options().clone();

        let path = orc.run_task("What is RAM?", &opts).await.unwrap();
        assert_eq!(path.file_name().unwrap(), "What_is_RAM.mp4");

        let task = orc.store().get("What is RAM?").unwrap();
        assert_eq!(task.script.as_deref(), Some("Script for: What is RAM?"));
        assert!(task.audio_path.as_ref().unwrap().exists());
        assert_eq!(task.image_prompt.as_deref(), Some(IMAGE_SKIPPED_PROMPT));
        assert_eq!(task.video_path.as_ref(), Some(&path));
        assert_eq!(task.status, TaskStatus::Succeeded);

        let req = renderer.last_request().unwrap();
        assert_eq!(req.background_path, config.video.default_background);
        assert_eq!(req.title, "What is RAM?");
    }

    #[tokio::test]
    async fn run_task_uses_generated_background_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let (mut orc, renderer) = orchestrator(dir.path(), &config);
        let mut opts = orc.default_options().clone();
        opts.generate_image = true;

        orc.run_task("What is RAM?", &opts).await.unwrap();

        let task = orc.store().get("What is RAM?").unwrap();
        assert_eq!(task.image_prompt.as_deref(), Some("illustration of What is RAM?"));
        assert!(task.generated_background);
        let bg = task.background_image_path.clone().unwrap();
        assert_eq!(renderer.last_request().unwrap().background_path, bg);
    }

    #[tokio::test]
    async fn user_background_skips_image_generation() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let (mut orc, renderer) = orchestrator(dir.path(), &config);
        let bg = dir.path().join("mine.png");
        std::fs::write(&bg, b"png").unwrap();

        let mut opts = orc.default_options().clone();
        opts.generate_image = true;
        opts.background = Some(bg.clone());
        opts.output_name = Some("custom.mp4".into());

        let path = orc.run_task("What is RAM?", &opts).await.unwrap();
        assert_eq!(path.file_name().unwrap(), "custom.mp4");
        let task = orc.store().get("What is RAM?").unwrap();
        assert_eq!(task.image_prompt.as_deref(), Some(IMAGE_SKIPPED_PROMPT));
        assert_eq!(renderer.last_request().unwrap().background_path, bg);
    }

    #[tokio::test]
    async fn audio_failure_keeps_script() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let (mut collab, _) = collaborators(dir.path());
        collab.speech = Arc::new(MockSpeech::failing());
        let mut orc = PipelineOrchestrator::new(collab, &config);
        let opts = orc.default_options().clone();

        let err = orc.run_task("What is RAM?", &opts).await.unwrap_err();
        assert!(matches!(err, PipelineError::Generation { stage: Stage::Audio, .. }));

        let task = orc.store().get("What is RAM?").unwrap();
        assert!(task.script.is_some());
        assert!(task.audio_path.is_none());
        assert!(task.video_path.is_none());
        assert!(matches!(task.status, TaskStatus::Failed(_)));
    }

    #[tokio::test]
    async fn image_failure_stops_before_video() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let (mut collab, renderer) = collaborators(dir.path());
        collab.image = Arc::new(MockImage {
            dir: dir.path().join("images"),
            fail: true,
        });
        let mut orc = PipelineOrchestrator::new(collab, &config);
        let mut opts = orc.default_options().clone();
        opts.generate_image = true;

        let err = orc.run_task("What is RAM?", &opts).await.unwrap_err();
        assert!(matches!(err, PipelineError::Generation { stage: Stage::Image, .. }));

        let task = orc.store().get("What is RAM?").unwrap();
        assert!(task.script.is_some());
        assert!(task.audio_path.is_some());
        assert!(task.background_image_path.is_none());
        assert!(task.video_path.is_none());
        assert!(matches!(task.status, TaskStatus::Failed(_)));
        assert!(renderer.last_request().is_none());
    }

    #[tokio::test]
    async fn blank_question_is_rejected_without_a_task() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let (mut orc, _) = orchestrator(dir.path(), &config);
        let opts = orc.default_options().clone();

        let err = orc.run_task("  ", &opts).await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyQuestion));
        assert!(orc.store().is_empty());
    }

    // -----------------------------------------------------------------------
    // Per-stage operations
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn stage_operations_require_a_known_task() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let (mut orc, _) = orchestrator(dir.path(), &config);

        let err = orc.generate_audio("nope", "alloy").await.unwrap_err();
        assert!(matches!(err, PipelineError::UnknownTask(_)));
        let err = orc.set_background("nope", None).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownTask(_)));
    }

    #[tokio::test]
    async fn edited_script_is_narrated() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let (mut orc, _) = orchestrator(dir.path(), &config);

        orc.generate_script("q", "English").await.unwrap();
        orc.set_script("q", "My own words.").unwrap();
        let audio = orc.generate_audio("q", "alloy").await.unwrap();
        assert_eq!(std::fs::read_to_string(audio).unwrap(), "My own words.");
    }

    #[tokio::test]
    async fn video_before_audio_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let (mut orc, _) = orchestrator(dir.path(), &config);
        let opts = orc.default_options().clone();

        orc.set_script("q", "text").unwrap();
        let err = orc.render_video("q", &opts).await.unwrap_err();
        assert!(matches!(err, PipelineError::MissingAudio(_)));
        assert!(orc.store().get("q").unwrap().video_path.is_none());
    }

    #[tokio::test]
    async fn rerunning_script_keeps_downstream_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let (mut orc, _) = orchestrator(dir.path(), &config);
        let opts = orc.default_options().clone();

        orc.run_task("q", &opts).await.unwrap();
        orc.generate_script("q", "French").await.unwrap();

        let task = orc.store().get("q").unwrap();
        assert!(task.audio_path.is_some());
        assert!(task.video_path.is_some());
    }

    #[tokio::test]
    async fn rerunning_script_clears_downstream_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.pipeline.invalidate_downstream = true;
        let (mut orc, _) = orchestrator(dir.path(), &config);
        let opts = orc.default_options().clone();

        orc.run_task("q", &opts).await.unwrap();
        orc.generate_script("q", "French").await.unwrap();

        let task = orc.store().get("q").unwrap();
        assert!(task.script.is_some());
        assert!(task.audio_path.is_none());
        assert!(task.video_path.is_none());
    }

    // -----------------------------------------------------------------------
    // run_batch
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn batch_continues_past_a_failed_task() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let (mut collab, _) = collaborators(dir.path());
        collab.video = Arc::new(MockRenderer::failing_on(&dir.path().join("videos"), "CPU"));
        let mut orc = PipelineOrchestrator::new(collab, &config);
        let opts = orc.default_options().clone();

        let mut seen = Vec::new();
        let report = orc
            .run_batch_text(THREE, ParseMode::Blocks, &opts, |p| {
                seen.push((p.completed, p.total, p.question.to_string()));
            })
            .await
            .unwrap();

        assert_eq!(report.videos.len(), 2);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("What is a CPU?"));
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2], (3, 3, "What is a GPU?".to_string()));
        assert_eq!(report.last.unwrap().question, "What is a GPU?");

        let failed = orc.store().get("What is a CPU?").unwrap();
        assert!(failed.script.is_some());
        assert!(failed.audio_path.is_some());
        assert!(failed.video_path.is_none());
        assert!(matches!(failed.status, TaskStatus::Failed(_)));
        assert_eq!(orc.store().get("What is RAM?").unwrap().status, TaskStatus::Succeeded);
    }

    #[tokio::test]
    async fn batch_names_videos_after_questions() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let (mut orc, renderer) = orchestrator(dir.path(), &config);
        let mut opts = orc.default_options().clone();
        opts.title = Some("Shared".into());
        opts.output_name = Some("same.mp4".into());

        let report = orc
            .run_batch_text("What is RAM?\nWhat is a CPU?", ParseMode::Lines, &opts, |_| {})
            .await
            .unwrap();

        let names: Vec<_> = report
            .videos
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["What_is_RAM.mp4", "What_is_a_CPU.mp4"]);
        assert_eq!(renderer.last_request().unwrap().title, "What is a CPU?");
    }

    #[tokio::test]
    async fn batch_gives_every_question_its_own_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let (mut orc, _) = orchestrator(dir.path(), &config);
        let mut opts = orc.default_options().clone();
        opts.generate_image = true;

        let text = "What is the difference between a process and a thread on Linux?\n\
                    What is the difference between a process and a thread on Windows?\n\
                    What is RAM?\n\
                    What is RAM\n\
                    What is RAM!";
        let report = orc
            .run_batch_text(text, ParseMode::Lines, &opts, |_| {})
            .await
            .unwrap();
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);

        let videos: HashSet<_> = report.videos.iter().collect();
        assert_eq!(videos.len(), 5);
        let backgrounds: HashSet<_> = orc
            .store()
            .iter()
            .map(|t| t.background_image_path.clone().unwrap())
            .collect();
        assert_eq!(backgrounds.len(), 5);

        let names: Vec<_> = report.videos[2..]
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["What_is_RAM.mp4", "What_is_RAM_2.mp4", "What_is_RAM_3.mp4"]);
    }

    #[tokio::test]
    async fn empty_batch_text_leaves_store_alone() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let (mut orc, _) = orchestrator(dir.path(), &config);
        orc.set_script("kept", "s").unwrap();
        let opts = orc.default_options().clone();

        let err = orc
            .run_batch_text(" \n\n ", ParseMode::Blocks, &opts, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
        assert_eq!(orc.store().questions(), vec!["kept"]);
    }
}
