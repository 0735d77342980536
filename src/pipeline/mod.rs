//! Task state and the runners that drive the stages over it.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use qa_video::config::AppConfig;
//! use qa_video::format::ParseMode;
//! use qa_video::pipeline::PipelineOrchestrator;
//!
//! # async fn example() -> Result<(), qa_video::error::PipelineError> {
//! let mut config = AppConfig::load().unwrap_or_default();
//! config.resolve_secrets();
//! let mut orchestrator = PipelineOrchestrator::from_config(&config);
//! let opts = orchestrator.default_options().clone();
//!
//! let report = orchestrator
//!     .run_batch_text("1. What is RAM?\n\n2. What is a CPU?", ParseMode::Blocks, &opts, |p| {
//!         println!("{}/{} {}", p.completed, p.total, p.question);
//!     })
//!     .await?;
//! println!("{} videos, {} warnings", report.videos.len(), report.warnings.len());
//! # Ok(())
//! # }
//! ```

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{BatchProgress, BatchReport, PipelineOrchestrator, TaskOptions};
pub use state::{Task, TaskStatus, TaskStore, IMAGE_SKIPPED_PROMPT};
