//! Input normalisation helpers.
//!
//! * [`sanitize_filename`] / [`output_stem`]: question text → file name.
//! * [`to_ffmpeg_color`]: color picker value → ffmpeg color token.
//! * [`parse_questions`]: free-text list → questions.

pub mod color;
pub mod filename;
pub mod questions;

pub use color::to_ffmpeg_color;
pub use filename::{output_stem, sanitize_filename, MAX_FILENAME_CHARS};
pub use questions::{parse_questions, ParseMode};
