//! # Artifact Registry
//!
//! Typed outputs produced by each skill. Skills build these, write them to the
//! project directory, then flatten them into the `output` mapping that the
//! pipeline merges into the execution input. Field names are camelCase on the
//! wire (`wordCount`, `originalityScore`).
//!
//! ## Usage
//!
//! ```rust,ignore
//! let draft = DraftArtifact { /* ... */ };
//! let output = to_output(&draft)?;
//! Ok(StepResult::completed("Draft written", output))
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Serialize an artifact into a step output mapping
pub fn to_output<T: Serialize>(artifact: &T) -> anyhow::Result<Map<String, Value>> {
    match serde_json::to_value(artifact).context("Failed to serialize artifact")? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("artifact serialized to {} instead of an object", other),
    }
}

// ============================================================================
// Trend Research Artifacts
// ============================================================================

/// A candidate angle for a satirical piece
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendCandidate {
    pub title: String,
    pub angle: String,
    /// Higher is more promising
    pub score: u32,
}

/// Output of the trend research skill
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchArtifact {
    pub trends: Vec<TrendCandidate>,
    pub recommendations: Vec<String>,
}

// ============================================================================
// Draft Writer Artifacts
// ============================================================================

/// Output of the draft writer skill
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftArtifact {
    pub title: String,
    pub content: String,
    /// Project-relative path of the written draft
    pub path: String,
    pub word_count: usize,
    pub sections: Vec<String>,
}

// ============================================================================
// Rights Checker Artifacts
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Trademarked brand named in the text
    Brand,
    /// A real person identified by title and name
    PublicFigure,
    /// Cliché lifted from wire copy
    StockPhrase,
    /// The same three-word run used over and over
    Repetition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RightsIssue {
    pub kind: IssueKind,
    pub term: String,
    /// 1-based line number of the first occurrence
    pub line: usize,
    pub severity: Severity,
    pub note: String,
}

/// Full rights/originality report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RightsReport {
    pub issues: Vec<RightsIssue>,
    /// 0.0 (all boilerplate) to 1.0 (fully original)
    pub originality_score: f64,
    pub risk_level: Severity,
    pub path: String,
}

/// Output of the rights checker skill
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RightsArtifact {
    pub report: RightsReport,
    pub summary: String,
}

// ============================================================================
// Editor Artifacts
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    LongSentence,
    PassiveVoice,
    Intensifier,
    DoubledWord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditSuggestion {
    pub id: String,
    pub kind: SuggestionKind,
    pub line: usize,
    pub original: String,
    pub suggestion: String,
}

/// Output of the editor skill
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewArtifact {
    pub suggestions: Vec<EditSuggestion>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_output_uses_camel_case() {
        let draft = DraftArtifact {
            title: "T".to_string(),
            content: "body".to_string(),
            path: "drafts/t.md".to_string(),
            word_count: 1,
            sections: vec!["headline".to_string()],
        };
        let output = to_output(&draft).unwrap();
        assert!(output.contains_key("wordCount"));
        assert!(output.contains_key("sections"));
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::High > Severity::Medium);
        assert_eq!(
            serde_json::to_string(&IssueKind::PublicFigure).unwrap(),
            "\"public_figure\""
        );
    }
}
