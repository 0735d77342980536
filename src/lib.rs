//! Turn questions into narrated videos.
//!
//! A question becomes a script (text generation), the script becomes speech
//! (text-to-speech), an optional background is generated, and `ffmpeg` muxes
//! audio, background and title into a video. [`pipeline`] keeps every
//! artifact per question so stages can be inspected and re-run individually.

pub mod app;
pub mod config;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod providers;
pub mod stages;

pub use error::PipelineError;
pub use pipeline::{PipelineOrchestrator, TaskOptions};
