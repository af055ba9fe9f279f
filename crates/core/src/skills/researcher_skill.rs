//! # Researcher Skill
//!
//! Proposes satirical angles for a topic from a static table of evergreen
//! formats, ranks them, and writes the candidate list to `research/`.

use async_trait::async_trait;
use serde_json::Value;

use super::agent::{input_str, Agent, ExecutionInput, StepOptions, StepResult};
use super::artifact_registry::{to_output, ResearchArtifact, TrendCandidate};
use crate::state::io::{slugify, write_project_file};

const DEFAULT_TOPIC: &str = "the news cycle";
const DEFAULT_COUNT: usize = 5;

/// (title template, angle template, base resonance, tags)
const ANGLES: &[(&str, &str, u32, &[&str])] = &[
    (
        "Local Committee Forms Subcommittee To Study {topic}",
        "Bureaucratic escalation: every response to {topic} spawns another layer of process",
        72,
        &["policy", "government", "tax", "committee", "regulation"],
    ),
    (
        "Startup Promises To Disrupt {topic}, Raises $40 Million",
        "Tech hype: a pitch deck solves {topic} by renaming it",
        78,
        &["ai", "tech", "startup", "app", "crypto"],
    ),
    (
        "Experts Agree {topic} Is Someone Else's Fault",
        "Blame diffusion: every stakeholder holds a press conference to point sideways",
        70,
        &["economy", "crisis", "climate", "prices"],
    ),
    (
        "Area Man Has Strong Opinions About {topic} After Reading One Headline",
        "Everyman overconfidence: expertise acquired in the time it takes to scroll",
        81,
        &["news", "social", "media", "internet"],
    ),
    (
        "Nation Relieved To Learn {topic} Was A Limited-Time Offer",
        "Marketing logic applied to something that should not be marketed",
        66,
        &["shopping", "brand", "holiday", "sale"],
    ),
    (
        "Study Finds {topic} Linked To Studies",
        "Science reporting parody: the methodology section is the punchline",
        64,
        &["science", "health", "study", "research"],
    ),
    (
        "Historians Already Tired Of Writing About {topic}",
        "Future retrospective: the present seen as a tedious chapter",
        60,
        &["history", "election", "war", "culture"],
    ),
];

#[derive(Debug, Clone, Default)]
pub struct ResearcherSkill;

impl ResearcherSkill {
    pub fn new() -> Self {
        Self
    }

    /// Rank every angle for a topic, best first
    pub fn rank(topic: &str) -> Vec<TrendCandidate> {
        let topic_words: Vec<String> = topic
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        let display = title_case(topic);

        let mut candidates: Vec<TrendCandidate> = ANGLES
            .iter()
            .map(|(title, angle, base, tags)| {
                let bonus = topic_words
                    .iter()
                    .filter(|w| tags.contains(&w.as_str()))
                    .count() as u32
                    * 8;
                TrendCandidate {
                    title: title.replace("{topic}", &display),
                    angle: angle.replace("{topic}", topic),
                    score: (base + bonus).min(100),
                }
            })
            .collect();

        // Stable sort keeps table order among ties
        candidates.sort_by(|a, b| b.score.cmp(&a.score));
        candidates
    }
}

#[async_trait]
impl Agent for ResearcherSkill {
    fn name(&self) -> &str {
        "trend-research"
    }

    async fn execute(
        &self,
        input: &ExecutionInput,
        options: &StepOptions,
    ) -> anyhow::Result<StepResult> {
        let topic = input_str(input, "topic").unwrap_or(DEFAULT_TOPIC);
        let count = options
            .get_u64("count")
            .map(|c| c as usize)
            .unwrap_or(DEFAULT_COUNT)
            .clamp(1, ANGLES.len());

        tracing::info!(topic = %topic, count, "Researching trends");

        let trends: Vec<TrendCandidate> = Self::rank(topic).into_iter().take(count).collect();

        let mut recommendations = Vec::new();
        if let Some(best) = trends.first() {
            recommendations.push(format!("Lead with \"{}\" (score {})", best.title, best.score));
        }
        if trends.iter().any(|t| t.score >= 80) {
            recommendations.push("At least one angle is strong enough for a standalone piece".to_string());
        } else {
            recommendations.push("No angle stands out; consider narrowing the topic".to_string());
        }

        let artifact = ResearchArtifact {
            trends,
            recommendations,
        };

        let relative = options
            .output_path
            .clone()
            .unwrap_or_else(|| format!("research/trends-{}.json", slugify(topic)));
        let json = serde_json::to_string_pretty(&artifact)?;
        write_project_file(&options.project_path, &relative, &json).await?;

        let mut output = to_output(&artifact)?;
        output.insert("researchPath".to_string(), Value::String(relative));

        Ok(StepResult::completed(
            format!("Found {} candidate trends for '{}'", artifact.trends.len(), topic),
            output,
        ))
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rank_boosts_matching_tags() {
        let ranked = ResearcherSkill::rank("ai startup");
        assert!(ranked[0].title.contains("Disrupt Ai Startup"));
        assert_eq!(ranked[0].score, 94);
        assert_eq!(ranked.len(), ANGLES.len());
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_execute_writes_research_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut input = ExecutionInput::new();
        input.insert("topic".to_string(), json!("parking tax"));
        let mut options = StepOptions::new(dir.path());
        options.extra.insert("count".to_string(), json!(3));

        let result = ResearcherSkill::new().execute(&input, &options).await.unwrap();

        assert!(result.success);
        assert_eq!(result.output["trends"].as_array().unwrap().len(), 3);
        assert!(result.output["recommendations"].as_array().unwrap().len() >= 1);
        assert!(dir.path().join("research/trends-parking-tax.json").is_file());
    }
}
