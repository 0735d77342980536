//! Free-text question lists → individual questions.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// A leading `12.`, `*` or `-` marker.  The marker must be followed by
/// whitespace (or end the text) so that `3.14 ...` or `-5 ...` survive.
static MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+\.|[*-])(?:\s+|$)").expect("valid regex"));

/// How [`parse_questions`] splits its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParseMode {
    /// Questions are separated by blank lines; lines within a block are
    /// joined with a single space.
    #[default]
    Blocks,
    /// Every non-empty line is its own question.
    Lines,
}

/// Split `text` into questions, stripping numbering and bullets.
///
/// Duplicates are kept; they collapse when inserted into the task store.
///
/// # Errors
///
/// [`PipelineError::EmptyInput`] when no question remains.
///
/// ```
/// use qa_video::format::{parse_questions, ParseMode};
///
/// let qs = parse_questions("1. What is RAM?\n\n2. What is a CPU?", ParseMode::Blocks).unwrap();
/// assert_eq!(qs, vec!["What is RAM?", "What is a CPU?"]);
/// ```
pub fn parse_questions(text: &str, mode: ParseMode) -> Result<Vec<String>, PipelineError> {
    let raw: Vec<String> = match mode {
        ParseMode::Blocks => blocks(text),
        ParseMode::Lines => text.lines().map(|l| l.trim().to_string()).collect(),
    };

    let questions: Vec<String> = raw
        .iter()
        .map(|q| strip_marker(q))
        .filter(|q| !q.is_empty())
        .collect();

    if questions.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(questions)
}

fn blocks(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                out.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current.join(" "));
    }
    out
}

fn strip_marker(question: &str) -> String {
    let trimmed = question.trim();
    MARKER.replace(trimmed, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_blocks() {
        let qs = parse_questions("1. What is RAM?\n\n2. What is a CPU?", ParseMode::Blocks).unwrap();
        assert_eq!(qs, vec!["What is RAM?", "What is a CPU?"]);
    }

    #[test]
    fn continuation_lines_are_joined() {
        let text = "What is a quantum computer?\nAnd how is it different?\n\n\n- Why is the sky blue?";
        let qs = parse_questions(text, ParseMode::Blocks).unwrap();
        assert_eq!(
            qs,
            vec![
                "What is a quantum computer? And how is it different?",
                "Why is the sky blue?"
            ]
        );
    }

    #[test]
    fn lines_mode_splits_every_line() {
        let text = "* first\n\n  second  \n10. third\n";
        let qs = parse_questions(text, ParseMode::Lines).unwrap();
        assert_eq!(qs, vec!["first", "second", "third"]);
    }

    #[test]
    fn blank_only_input_is_rejected() {
        let err = parse_questions("\n   \n\t\n", ParseMode::Blocks).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
        let err = parse_questions("", ParseMode::Lines).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
    }

    #[test]
    fn bare_markers_are_discarded() {
        let err = parse_questions("-\n\n3.\n\n*", ParseMode::Blocks).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
    }

    #[test]
    fn numbers_that_are_not_markers_survive() {
        let qs = parse_questions("3.14 is pi?\n-5 degrees is cold?", ParseMode::Lines).unwrap();
        assert_eq!(qs, vec!["3.14 is pi?", "-5 degrees is cold?"]);
    }

    #[test]
    fn only_one_marker_is_stripped() {
        let qs = parse_questions("1. - nested?", ParseMode::Lines).unwrap();
        assert_eq!(qs, vec!["- nested?"]);
    }

    #[test]
    fn duplicates_are_kept() {
        let qs = parse_questions("a?\n\na?", ParseMode::Blocks).unwrap();
        assert_eq!(qs.len(), 2);
    }
}
