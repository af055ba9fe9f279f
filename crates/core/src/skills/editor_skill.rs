//! # Editor Skill
//!
//! Line-level editorial pass over a draft. Produces numbered suggestions and a
//! markdown review in `reviews/`.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use super::agent::{Agent, ExecutionInput, StepOptions, StepResult};
use super::artifact_registry::{to_output, EditSuggestion, ReviewArtifact, SuggestionKind};
use super::text_helpers::{content, piece_slug, sentences};
use crate::state::io::write_project_file;

const DEFAULT_MAX_SUGGESTIONS: usize = 20;
const DEFAULT_LONG_SENTENCE: usize = 30;

fn passive_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(?:is|are|was|were|be|been|being)\s+\w+ed\b")
            .expect("passive pattern is valid")
    })
}

fn intensifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(?:very|really|quite|extremely|totally|literally)\s+")
            .expect("intensifier pattern is valid")
    })
}

#[derive(Debug, Clone, Default)]
pub struct EditorSkill;

impl EditorSkill {
    pub fn new() -> Self {
        Self
    }

    /// Review draft text, returning at most `max` suggestions in document order
    pub fn review(text: &str, max: usize, long_sentence: usize) -> Vec<EditSuggestion> {
        let mut suggestions = Vec::new();

        for (index, line) in text.lines().enumerate() {
            // Headings and quotes are left alone
            if line.trim_start().starts_with('#') || line.trim_start().starts_with('>') {
                continue;
            }
            let line_no = index + 1;

            for sentence in sentences(line) {
                let count = sentence.split_whitespace().count();
                if count > long_sentence {
                    suggestions.push((
                        line_no,
                        SuggestionKind::LongSentence,
                        sentence.to_string(),
                        format!("Split this {}-word sentence; the joke lands faster", count),
                    ));
                }
            }

            for m in passive_pattern().find_iter(line) {
                suggestions.push((
                    line_no,
                    SuggestionKind::PassiveVoice,
                    m.as_str().to_string(),
                    "Rewrite in active voice and name who did it".to_string(),
                ));
            }

            for m in intensifier_pattern().find_iter(line) {
                suggestions.push((
                    line_no,
                    SuggestionKind::Intensifier,
                    m.as_str().trim().to_string(),
                    "Cut the intensifier".to_string(),
                ));
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();
            for pair in tokens.windows(2) {
                let a = pair[0].trim_matches(|c: char| !c.is_alphanumeric());
                let b = pair[1].trim_matches(|c: char| !c.is_alphanumeric());
                if !a.is_empty() && a.eq_ignore_ascii_case(b) {
                    suggestions.push((
                        line_no,
                        SuggestionKind::DoubledWord,
                        format!("{} {}", pair[0], pair[1]),
                        format!("Remove the repeated \"{}\"", a),
                    ));
                }
            }
        }

        suggestions
            .into_iter()
            .take(max)
            .enumerate()
            .map(|(i, (line, kind, original, suggestion))| EditSuggestion {
                id: format!("S{:03}", i + 1),
                kind,
                line,
                original,
                suggestion,
            })
            .collect()
    }
}

fn render_review(slug: &str, suggestions: &[EditSuggestion]) -> String {
    let mut out = format!("# Editorial review: {}\n\n", slug);
    if suggestions.is_empty() {
        out.push_str("No suggestions. Ship it.\n");
        return out;
    }
    for s in suggestions {
        out.push_str(&format!(
            "- **{}** (line {}, {:?}): \"{}\" → {}\n",
            s.id, s.line, s.kind, s.original, s.suggestion
        ));
    }
    out
}

#[async_trait]
impl Agent for EditorSkill {
    fn name(&self) -> &str {
        "editor"
    }

    async fn execute(
        &self,
        input: &ExecutionInput,
        options: &StepOptions,
    ) -> anyhow::Result<StepResult> {
        let Some(text) = content(input) else {
            anyhow::bail!("editor needs draft content in the input");
        };

        let max = options
            .get_u64("maxSuggestions")
            .map(|m| m as usize)
            .unwrap_or(DEFAULT_MAX_SUGGESTIONS);
        let long_sentence = options
            .get_u64("longSentenceWords")
            .map(|m| m as usize)
            .unwrap_or(DEFAULT_LONG_SENTENCE);

        let suggestions = Self::review(text, max, long_sentence);
        tracing::info!(count = suggestions.len(), "Editorial review complete");

        let slug = piece_slug(input);
        let relative = options
            .output_path
            .clone()
            .unwrap_or_else(|| format!("reviews/review-{}.md", slug));
        write_project_file(
            &options.project_path,
            &relative,
            &render_review(&slug, &suggestions),
        )
        .await?;

        let artifact = ReviewArtifact { suggestions };
        let mut output = to_output(&artifact)?;
        output.insert("reviewPath".to_string(), Value::String(relative));

        Ok(StepResult::completed(
            format!("{} editorial suggestion(s)", artifact.suggestions.len()),
            output,
        ))
    }
}
