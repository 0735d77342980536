//! Interactive session over a process-local task store.
//!
//! A [`Session`] reads one [`SessionCommand`] per line and drives the
//! [`PipelineOrchestrator`] with it, so a user can generate, inspect, edit
//! and re-run individual stages across many questions.
//!
//! | Command | Effect |
//! |---------|--------|
//! | `load <file>` | Parse a question list file, replacing the store |
//! | `add <question>` | Append one question |
//! | `list` | Tasks with status and progress |
//! | `show <n>` | Every field of task `n` |
//! | `script <n>` | Generate the script |
//! | `edit <n> <text>` | Replace the script with `text` |
//! | `audio <n>` | Narrate the script |
//! | `image <n>` | Generate a background image |
//! | `bg <n> [path]` | Set or clear the user background |
//! | `video <n>` | Render the video |
//! | `run <n>` | All stages for task `n` |
//! | `batch` | All stages for every task, continuing past failures |
//! | `help` / `quit` | |
//!
//! Task numbers are 1-based positions as shown by `list`.

use std::fmt::Write as _;
use std::path::PathBuf;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::PipelineError;
use crate::format::{parse_questions, ParseMode};
use crate::pipeline::{PipelineOrchestrator, Task, TaskOptions};

const HELP: &str = "\
commands:
  load <file>        replace the task list with the questions in <file>
  add <question>     add one question
  list               show all tasks
  show <n>           show every field of task n
  script <n>         generate the script for task n
  edit <n> <text>    replace the script of task n
  audio <n>          generate narration for task n
  image <n>          generate a background image for task n
  bg <n> [path]      set (or clear) the background of task n
  video <n>          render the video for task n
  run <n>            run every stage for task n
  batch              run every task, continuing past failures
  help               this text
  quit               leave the session";

// ---------------------------------------------------------------------------
// SessionCommand
// ---------------------------------------------------------------------------

/// One parsed session line.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Load(PathBuf),
    Add(String),
    List,
    Show(usize),
    Script(usize),
    Edit(usize, String),
    Audio(usize),
    Image(usize),
    Background(usize, Option<PathBuf>),
    Video(usize),
    Run(usize),
    Batch,
    Help,
    Quit,
}

impl SessionCommand {
    /// Parse a line; the error is a message for the user.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((w, r)) => (w, r.trim()),
            None => (line, ""),
        };

        let cmd = match word.to_ascii_lowercase().as_str() {
            "load" => Self::Load(PathBuf::from(required(rest, "load <file>")?)),
            "add" => Self::Add(required(rest, "add <question>")?.to_string()),
            "list" | "ls" => Self::List,
            "show" => Self::Show(task_number(rest)?),
            "script" => Self::Script(task_number(rest)?),
            "edit" => {
                let (n, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                Self::Edit(task_number(n)?, required(text, "edit <n> <text>")?.to_string())
            }
            "audio" => Self::Audio(task_number(rest)?),
            "image" => Self::Image(task_number(rest)?),
            "bg" | "background" => {
                let (n, path) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                let path = path.trim();
                Self::Background(
                    task_number(n)?,
                    (!path.is_empty()).then(|| PathBuf::from(path)),
                )
            }
            "video" => Self::Video(task_number(rest)?),
            "run" => Self::Run(task_number(rest)?),
            "batch" => Self::Batch,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            "" => return Err("empty command; type `help`".into()),
            other => return Err(format!("unknown command `{other}`; type `help`")),
        };
        Ok(cmd)
    }
}

fn required<'a>(rest: &'a str, usage: &str) -> Result<&'a str, String> {
    if rest.is_empty() {
        Err(format!("usage: {usage}"))
    } else {
        Ok(rest)
    }
}

fn task_number(text: &str) -> Result<usize, String> {
    match text.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("expected a task number, got {:?}", text.trim())),
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// What the caller should do after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Continue(String),
    Quit,
}

pub struct Session {
    orchestrator: PipelineOrchestrator,
    opts: TaskOptions,
    mode: ParseMode,
}

impl Session {
    pub fn new(orchestrator: PipelineOrchestrator, opts: TaskOptions, mode: ParseMode) -> Self {
        Self {
            orchestrator,
            opts,
            mode,
        }
    }

    pub fn orchestrator(&self) -> &PipelineOrchestrator {
        &self.orchestrator
    }

    /// Read commands from `input` until `quit` or end of input.
    ///
    /// Command failures are reported on `output` and the session carries on.
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        output.write_all(b"qa-video session; type `help` for commands\n> ").await?;
        output.flush().await?;

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                output.write_all(b"> ").await?;
                output.flush().await?;
                continue;
            }
            let reply = match SessionCommand::parse(&line) {
                Ok(cmd) => match self.execute(cmd).await {
                    Ok(Outcome::Quit) => break,
                    Ok(Outcome::Continue(text)) => text,
                    Err(e) => format!("error: {e}"),
                },
                Err(msg) => msg,
            };
            output.write_all(reply.as_bytes()).await?;
            output.write_all(b"\n> ").await?;
            output.flush().await?;
        }
        output.write_all(b"\n").await?;
        output.flush().await
    }

    pub async fn execute(&mut self, cmd: SessionCommand) -> Result<Outcome, PipelineError> {
        log::debug!("session: {cmd:?}");
        let text = match cmd {
            SessionCommand::Load(path) => {
                let text = tokio::fs::read_to_string(&path).await?;
                let questions = parse_questions(&text, self.mode)?;
                let n = questions.len();
                self.orchestrator.store_mut().replace_with_questions(questions);
                format!("loaded {n} question(s) from {}", path.display())
            }
            SessionCommand::Add(question) => {
                let store = self.orchestrator.store_mut();
                store.entry_or_insert(&question);
                format!("task {} added", store.len())
            }
            SessionCommand::List => self.list(),
            SessionCommand::Show(n) => describe(self.task_at(n)?),
            SessionCommand::Script(n) => {
                let question = self.question_at(n)?;
                self.orchestrator
                    .generate_script(&question, &self.opts.language)
                    .await?
            }
            SessionCommand::Edit(n, text) => {
                let question = self.question_at(n)?;
                self.orchestrator.set_script(&question, &text)?;
                format!("script of task {n} updated")
            }
            SessionCommand::Audio(n) => {
                let question = self.question_at(n)?;
                let path = self.orchestrator.generate_audio(&question, &self.opts.voice).await?;
                format!("audio: {}", path.display())
            }
            SessionCommand::Image(n) => {
                let question = self.question_at(n)?;
                let path = self
                    .orchestrator
                    .generate_image(&question, self.opts.width, self.opts.height)
                    .await?;
                format!("background: {}", path.display())
            }
            SessionCommand::Background(n, path) => {
                let question = self.question_at(n)?;
                let reply = match &path {
                    Some(p) => format!("background of task {n} set to {}", p.display()),
                    None => format!("background of task {n} cleared"),
                };
                self.orchestrator.set_background(&question, path)?;
                reply
            }
            SessionCommand::Video(n) => {
                let question = self.question_at(n)?;
                let path = self.orchestrator.render_video(&question, &self.opts).await?;
                format!("video: {}", path.display())
            }
            SessionCommand::Run(n) => {
                let question = self.question_at(n)?;
                let path = self.orchestrator.run_task(&question, &self.opts).await?;
                format!("video: {}", path.display())
            }
            SessionCommand::Batch => {
                if self.orchestrator.store().is_empty() {
                    return Err(PipelineError::EmptyInput);
                }
                let report = self
                    .orchestrator
                    .run_batch(&self.opts, |p| {
                        log::info!("batch: {}/{} {}", p.completed, p.total, p.question);
                    })
                    .await;
                let mut out = format!("{} video(s) produced", report.videos.len());
                for path in &report.videos {
                    let _ = write!(out, "\n  {}", path.display());
                }
                for warning in &report.warnings {
                    let _ = write!(out, "\n  warning: {warning}");
                }
                out
            }
            SessionCommand::Help => HELP.to_string(),
            SessionCommand::Quit => return Ok(Outcome::Quit),
        };
        Ok(Outcome::Continue(text))
    }

    fn list(&self) -> String {
        let store = self.orchestrator.store();
        if store.is_empty() {
            return "no tasks; use `load` or `add`".to_string();
        }
        let mut out = String::new();
        for (i, task) in store.iter().enumerate() {
            let progress = task.progress().map_or("new", |s| s.label());
            let _ = writeln!(
                out,
                "{:>3}. [{:<9}] {:<6} {}",
                i + 1,
                task.status.label(),
                progress,
                task.question
            );
        }
        out.pop();
        out
    }

    fn task_at(&self, n: usize) -> Result<&Task, PipelineError> {
        self.orchestrator
            .store()
            .get_by_index(n - 1)
            .ok_or_else(|| PipelineError::UnknownTask(format!("#{n}")))
    }

    fn question_at(&self, n: usize) -> Result<String, PipelineError> {
        self.task_at(n).map(|t| t.question.clone())
    }
}

fn describe(task: &Task) -> String {
    fn path(p: &Option<PathBuf>) -> String {
        p.as_ref().map_or("-".to_string(), |p| p.display().to_string())
    }

    let mut out = String::new();
    let _ = writeln!(out, "question:   {}", task.question);
    let _ = writeln!(out, "status:     {:?}", task.status);
    let _ = writeln!(out, "script:     {}", task.script.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "audio:      {}", path(&task.audio_path));
    let _ = writeln!(out, "image:      {}", task.image_prompt.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "background: {}", path(&task.background_image_path));
    let _ = write!(out, "video:      {}", path(&task.video_path));
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::collaborators;
    use crate::stages::test_config;

    fn session(root: &std::path::Path) -> Session {
        let config = test_config(root);
        let (collab, _) = collaborators(root);
        let orc = PipelineOrchestrator::new(collab, &config);
        let opts = orc.default_options().clone();
        Session::new(orc, opts, ParseMode::Blocks)
    }

    async fn reply(session: &mut Session, line: &str) -> String {
        let cmd = SessionCommand::parse(line).unwrap();
        match session.execute(cmd).await.unwrap() {
            Outcome::Continue(text) => text,
            Outcome::Quit => "<quit>".into(),
        }
    }

    // ---- SessionCommand::parse ---

    #[test]
    fn parses_commands() {
        assert_eq!(SessionCommand::parse("list").unwrap(), SessionCommand::List);
        assert_eq!(SessionCommand::parse("  RUN 2 ").unwrap(), SessionCommand::Run(2));
        assert_eq!(
            SessionCommand::parse("add What is RAM?").unwrap(),
            SessionCommand::Add("What is RAM?".into())
        );
        assert_eq!(
            SessionCommand::parse("edit 1 New script here.").unwrap(),
            SessionCommand::Edit(1, "New script here.".into())
        );
        assert_eq!(
            SessionCommand::parse("bg 3 /tmp/a b.png").unwrap(),
            SessionCommand::Background(3, Some(PathBuf::from("/tmp/a b.png")))
        );
        assert_eq!(SessionCommand::parse("bg 3").unwrap(), SessionCommand::Background(3, None));
        assert_eq!(SessionCommand::parse("exit").unwrap(), SessionCommand::Quit);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(SessionCommand::parse("show").is_err());
        assert!(SessionCommand::parse("show 0").is_err());
        assert!(SessionCommand::parse("audio two").is_err());
        assert!(SessionCommand::parse("edit 1").is_err());
        assert!(SessionCommand::parse("add").is_err());
        assert!(SessionCommand::parse("dance").unwrap_err().contains("dance"));
    }

    // ---- Session ---

    #[tokio::test]
    async fn step_by_step_flow() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());

        assert_eq!(reply(&mut s, "add What is RAM?").await, "task 1 added");
        assert_eq!(reply(&mut s, "script 1").await, "Script for: What is RAM?");
        reply(&mut s, "edit 1 Random access memory.").await;
        assert!(reply(&mut s, "audio 1").await.starts_with("audio: "));
        assert!(reply(&mut s, "video 1").await.ends_with("What_is_RAM.mp4"));

        let shown = reply(&mut s, "show 1").await;
        assert!(shown.contains("script:     Random access memory."));
        assert!(shown.contains("What_is_RAM.mp4"));
        assert!(reply(&mut s, "list").await.contains("video  What is RAM?"));
    }

    #[tokio::test]
    async fn load_then_batch() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("questions.txt");
        std::fs::write(&file, "1. What is RAM?\n\n2. What is a CPU?\n").unwrap();
        let mut s = session(dir.path());

        let loaded = reply(&mut s, &format!("load {}", file.display())).await;
        assert!(loaded.starts_with("loaded 2 question(s)"));
        let out = reply(&mut s, "batch").await;
        assert!(out.starts_with("2 video(s) produced"));
        assert!(!out.contains("warning"));
    }

    #[tokio::test]
    async fn errors_name_the_problem() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());

        let err = s.execute(SessionCommand::Audio(4)).await.unwrap_err();
        assert!(matches!(err, PipelineError::UnknownTask(_)));
        let err = s.execute(SessionCommand::Batch).await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
    }

    #[tokio::test]
    async fn run_loop_reports_and_quits() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());
        let input: &[u8] = b"add q\nvideo 1\nfly\nquit\nlist\n";
        let mut output = Vec::new();

        s.run(input, &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("task 1 added"));
        assert!(text.contains("error: no audio available"));
        assert!(text.contains("unknown command `fly`"));
        assert!(!text.contains("no tasks"));
        assert_eq!(s.orchestrator().store().len(), 1);
    }
}
