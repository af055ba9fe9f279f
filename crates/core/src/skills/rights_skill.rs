//! # Rights Skill
//!
//! Flags legal and originality risk in a draft: named brands, real people
//! identified by title, wire-copy clichés, and heavy phrase repetition.
//! Writes the report to `reports/`.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use super::agent::{Agent, ExecutionInput, StepOptions, StepResult};
use super::artifact_registry::{
    to_output, IssueKind, RightsArtifact, RightsIssue, RightsReport, Severity,
};
use super::text_helpers::{content, piece_slug, words};
use crate::state::io::write_project_file;

const BRANDS: &[&str] = &[
    "Apple", "Google", "Amazon", "Disney", "Coca-Cola", "McDonald's", "Tesla", "Meta",
    "Microsoft", "Nike", "Starbucks", "Netflix",
];

const STOCK_PHRASES: &[&str] = &[
    "in a shocking turn of events",
    "sources close to",
    "at the end of the day",
    "only time will tell",
    "breaking news",
    "it remains to be seen",
];

/// Trigrams seen at least this often count as repetition
const REPEAT_THRESHOLD: usize = 3;

fn public_figure_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"\b(?:President|Senator|Governor|Mayor|Prime Minister|CEO|Judge|Congresswoman|Congressman)\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?",
        )
        .expect("public figure pattern is valid")
    })
}

fn brand_patterns() -> &'static Vec<(&'static str, Regex)> {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        BRANDS
            .iter()
            .map(|b| {
                let pattern = format!(r"\b{}\b", regex::escape(b));
                (*b, Regex::new(&pattern).expect("escaped brand is valid"))
            })
            .collect()
    })
}

#[derive(Debug, Clone, Default)]
pub struct RightsSkill;

impl RightsSkill {
    pub fn new() -> Self {
        Self
    }

    /// Analyze draft text. `path` is recorded in the report.
    pub fn analyze(text: &str, path: &str) -> RightsReport {
        let mut issues = Vec::new();
        let mut seen_terms: HashSet<String> = HashSet::new();

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;

            for (brand, pattern) in brand_patterns() {
                if pattern.is_match(line) && seen_terms.insert(brand.to_string()) {
                    issues.push(RightsIssue {
                        kind: IssueKind::Brand,
                        term: brand.to_string(),
                        line: line_no,
                        severity: Severity::Medium,
                        note: "Trademark named; keep the use clearly parodic and non-commercial"
                            .to_string(),
                    });
                }
            }

            for m in public_figure_pattern().find_iter(line) {
                let term = m.as_str().to_string();
                if seen_terms.insert(term.clone()) {
                    issues.push(RightsIssue {
                        kind: IssueKind::PublicFigure,
                        term,
                        line: line_no,
                        severity: Severity::High,
                        note: "Identifiable person; avoid statements that read as factual claims"
                            .to_string(),
                    });
                }
            }

            let lower = line.to_lowercase();
            for phrase in STOCK_PHRASES {
                if lower.contains(phrase) && seen_terms.insert(phrase.to_string()) {
                    issues.push(RightsIssue {
                        kind: IssueKind::StockPhrase,
                        term: phrase.to_string(),
                        line: line_no,
                        severity: Severity::Low,
                        note: "Stock phrase; rewrite in the piece's own voice".to_string(),
                    });
                }
            }
        }

        let (repeated, ratio) = repeated_trigrams(text);
        for trigram in repeated {
            let line = text
                .lines()
                .position(|l| l.to_lowercase().contains(&trigram))
                .map(|i| i + 1)
                .unwrap_or(0);
            issues.push(RightsIssue {
                kind: IssueKind::Repetition,
                term: trigram,
                line,
                severity: Severity::Low,
                note: format!("Used {} or more times", REPEAT_THRESHOLD),
            });
        }

        let stock_count = issues
            .iter()
            .filter(|i| i.kind == IssueKind::StockPhrase)
            .count();
        let originality_score =
            ((1.0 - ratio - 0.05 * stock_count as f64).clamp(0.0, 1.0) * 100.0).round() / 100.0;

        let mut risk_level = issues
            .iter()
            .map(|i| i.severity)
            .filter(|s| *s > Severity::Low)
            .max()
            .unwrap_or(Severity::Low);
        if originality_score < 0.7 && risk_level < Severity::Medium {
            risk_level = Severity::Medium;
        }

        RightsReport {
            issues,
            originality_score,
            risk_level,
            path: path.to_string(),
        }
    }
}

/// Repeated trigrams (sorted) and the share of trigram occurrences they account for
fn repeated_trigrams(text: &str) -> (Vec<String>, f64) {
    let words = words(text);
    if words.len() < 3 {
        return (Vec::new(), 0.0);
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for window in words.windows(3) {
        *counts.entry(window.join(" ")).or_default() += 1;
    }

    let total = words.len() - 2;
    let mut repeated: Vec<(String, usize)> = counts
        .into_iter()
        .filter(|(_, c)| *c >= REPEAT_THRESHOLD)
        .collect();
    repeated.sort();

    let repeated_occurrences: usize = repeated.iter().map(|(_, c)| c).sum();
    let ratio = repeated_occurrences as f64 / total as f64;
    (repeated.into_iter().map(|(t, _)| t).collect(), ratio)
}

fn summarize(report: &RightsReport) -> String {
    let risk = match report.risk_level {
        Severity::Low => "low",
        Severity::Medium => "medium",
        Severity::High => "high",
    };
    format!(
        "{} issue(s), risk {}, originality {:.2}",
        report.issues.len(),
        risk,
        report.originality_score
    )
}

#[async_trait]
impl Agent for RightsSkill {
    fn name(&self) -> &str {
        "rights-checker"
    }

    async fn execute(
        &self,
        input: &ExecutionInput,
        options: &StepOptions,
    ) -> anyhow::Result<StepResult> {
        let Some(text) = content(input) else {
            anyhow::bail!("rights check needs draft content in the input");
        };

        let relative = options
            .output_path
            .clone()
            .unwrap_or_else(|| format!("reports/rights-{}.json", piece_slug(input)));

        let report = Self::analyze(text, &relative);
        tracing::info!(
            issues = report.issues.len(),
            originality = report.originality_score,
            "Rights check complete"
        );

        write_project_file(
            &options.project_path,
            &relative,
            &serde_json::to_string_pretty(&report)?,
        )
        .await?;

        let summary = summarize(&report);
        let artifact = RightsArtifact {
            report,
            summary: summary.clone(),
        };
        let mut output = to_output(&artifact)?;
        output.insert("reportPath".to_string(), Value::String(relative));

        Ok(StepResult::completed(summary, output))
    }
}
