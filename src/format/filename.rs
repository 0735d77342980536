//! Question text → file-name token.
//!
//! Batch runs derive each task's output file name from its question, so the
//! mapping must be deterministic and must never produce a name the file
//! system rejects.

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest token [`sanitize_filename`] will return, in characters.
pub const MAX_FILENAME_CHARS: usize = 50;

/// Characters that are invalid in a file name on at least one platform.
const FORBIDDEN: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Map arbitrary text to a token safe to use as a file-name component.
///
/// 1. Remove `\ / * ? : " < > |`.
/// 2. Replace whitespace runs with a single `_`.
/// 3. Truncate to [`MAX_FILENAME_CHARS`] characters.
/// 4. Strip leading and trailing `_`.
///
/// ```
/// use qa_video::format::sanitize_filename;
///
/// assert_eq!(sanitize_filename("What is RAM?"), "What_is_RAM");
/// assert_eq!(sanitize_filename("  a/b  c "), "ab_c");
/// ```
pub fn sanitize_filename(text: &str) -> String {
    let cleaned: String = text.chars().filter(|c| !FORBIDDEN.contains(c)).collect();
    let joined = WHITESPACE.replace_all(&cleaned, "_");
    let truncated: String = joined.chars().take(MAX_FILENAME_CHARS).collect();
    truncated.trim_matches('_').to_string()
}

/// [`sanitize_filename`], falling back to `"question"` when nothing survives.
pub fn output_stem(text: &str) -> String {
    let stem = sanitize_filename(text);
    if stem.is_empty() {
        "question".to_string()
    } else {
        stem
    }
}
