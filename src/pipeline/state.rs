//! Per-question task state.
//!
//! [`Task`] holds every artifact produced for one question. [`TaskStore`] is
//! the insertion-ordered collection of tasks the runners and the interactive
//! session work on. Both live only for the duration of the process.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::format::output_stem;
use crate::stages::Stage;

/// Recorded as the image prompt when image generation was skipped.
pub const IMAGE_SKIPPED_PROMPT: &str = "(image generation skipped)";

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

/// Batch state of a task.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    /// The message of the error that stopped the task.
    Failed(String),
}

impl TaskStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed(_) => "failed",
        }
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// Everything generated so far for one question.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Task {
    pub question: String,
    pub script: Option<String>,
    pub audio_path: Option<PathBuf>,
    pub image_prompt: Option<String>,
    pub background_image_path: Option<PathBuf>,
    /// `true` when `background_image_path` came from the image stage rather
    /// than from the user.
    pub generated_background: bool,
    pub video_path: Option<PathBuf>,
    pub status: TaskStatus,
}

impl Task {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }

    /// Clear the artifacts that depend on `stage`.
    ///
    /// A user-supplied background survives a new script; a generated one
    /// does not.
    pub fn invalidate_after(&mut self, stage: Stage) {
        match stage {
            Stage::Script => {
                self.audio_path = None;
                self.image_prompt = None;
                if self.generated_background {
                    self.background_image_path = None;
                    self.generated_background = false;
                }
                self.video_path = None;
            }
            Stage::Audio | Stage::Image => self.video_path = None,
            Stage::Video => {}
        }
    }

    /// The last stage whose artifact is present.
    pub fn progress(&self) -> Option<Stage> {
        if self.video_path.is_some() {
            Some(Stage::Video)
        } else if self.image_prompt.is_some() {
            Some(Stage::Image)
        } else if self.audio_path.is_some() {
            Some(Stage::Audio)
        } else if self.script.is_some() {
            Some(Stage::Script)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// TaskStore
// ---------------------------------------------------------------------------

/// Tasks keyed by question, iterated in insertion order.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole store with fresh tasks for `questions`.
    ///
    /// A question listed twice keeps its first position and a single task.
    pub fn replace_with_questions<I, S>(&mut self, questions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clear();
        for question in questions {
            let question = question.into();
            if let Some(&i) = self.index.get(&question) {
                self.tasks[i] = Task::new(question);
            } else {
                self.insert_new(question);
            }
        }
    }

    /// The task for `question`, created at the end of the store if absent.
    pub fn entry_or_insert(&mut self, question: &str) -> &mut Task {
        let i = match self.index.get(question) {
            Some(&i) => i,
            None => self.insert_new(question.to_string()),
        };
        &mut self.tasks[i]
    }

    pub fn get(&self, question: &str) -> Option<&Task> {
        self.index.get(question).map(|&i| &self.tasks[i])
    }

    pub fn get_mut(&mut self, question: &str) -> Option<&mut Task> {
        match self.index.get(question) {
            Some(&i) => Some(&mut self.tasks[i]),
            None => None,
        }
    }

    /// Zero-based position in insertion order.
    pub fn get_by_index(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Task> {
        self.tasks.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
        self.index.clear();
    }

    /// Questions in insertion order.
    pub fn questions(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.question.clone()).collect()
    }

    /// File stem for the artifacts of `question`.
    ///
    /// Starts from [`output_stem`]; when an earlier task already claimed the
    /// same stem, `_2`, `_3`, … is appended so no two tasks share a file.
    pub fn file_stem(&self, question: &str) -> Option<String> {
        let target = *self.index.get(question)?;
        let mut taken = HashSet::new();
        for task in &self.tasks[..=target] {
            let base = output_stem(&task.question);
            let mut stem = base.clone();
            let mut n = 1;
            while taken.contains(&stem) {
                n += 1;
                stem = format!("{base}_{n}");
            }
            taken.insert(stem.clone());
            if task.question == question {
                return Some(stem);
            }
        }
        None
    }

    fn insert_new(&mut self, question: String) -> usize {
        let i = self.tasks.len();
        self.index.insert(question.clone(), i);
        self.tasks.push(Task::new(question));
        i
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
