//! # Text Helpers
//!
//! Small text utilities shared by the analysis skills.

use serde_json::Value;

use super::agent::{input_str, ExecutionInput};
use crate::state::io::slugify;

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Lowercased alphanumeric words
pub fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Split a line into sentences, keeping terminal punctuation
pub fn sentences(line: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;

    for (i, c) in line.char_indices() {
        if matches!(c, '.' | '!' | '?') {
            let end = i + c.len_utf8();
            let s = line[start..end].trim();
            if !s.is_empty() {
                out.push(s);
            }
            start = end;
        }
    }

    let tail = line[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

/// Slug identifying the piece being worked on.
///
/// Prefers the draft file stem, then the title, then the topic.
pub fn piece_slug(input: &ExecutionInput) -> String {
    if let Some(path) = input_str(input, "path") {
        if let Some(stem) = std::path::Path::new(path).file_stem() {
            return slugify(&stem.to_string_lossy());
        }
    }
    input_str(input, "title")
        .or_else(|| input_str(input, "topic"))
        .map(slugify)
        .unwrap_or_else(|| "untitled".to_string())
}

/// Draft content from the input, if any
pub fn content(input: &ExecutionInput) -> Option<&str> {
    input
        .get("content")
        .and_then(Value::as_str)
        .filter(|c| !c.trim().is_empty())
}
