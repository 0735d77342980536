//! Where qa-video keeps its per-user files.
//!
//! | Platform | Directory |
//! |----------|-----------|
//! | Linux    | `~/.config/qa-video/` |
//! | macOS    | `~/Library/Application Support/qa-video/` |
//! | Windows  | `%APPDATA%\qa-video\` |

use std::path::{Path, PathBuf};

const APP_DIR: &str = "qa-video";

/// Per-user file locations.
#[derive(Debug, Clone, PartialEq)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    /// `settings.toml`, read by [`AppConfig::load`](super::AppConfig::load).
    pub settings_file: PathBuf,
    /// Optional `.env` with API keys, loaded after the working directory's.
    pub env_file: PathBuf,
}

impl AppPaths {
    /// Paths under the platform config directory, or `./qa-video` when the
    /// platform has none.
    pub fn new() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::in_dir(&base.join(APP_DIR))
    }

    /// Paths rooted at `config_dir`.
    pub fn in_dir(config_dir: &Path) -> Self {
        Self {
            config_dir: config_dir.to_path_buf(),
            settings_file: config_dir.join("settings.toml"),
            env_file: config_dir.join(".env"),
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
