//! Configuration module.
//!
//! Provides `AppConfig` (top-level settings), one sub-config per provider
//! and pipeline concern, `AppPaths` for the platform config directory, and
//! TOML persistence via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, ImageConfig, LlmConfig, OutputConfig, PipelineConfig, TtsConfig, TtsProvider,
    VideoConfig,
};
