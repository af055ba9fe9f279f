//! # Writer Skill
//!
//! Fills the draft template with an angle chosen upstream (accepted trends,
//! raw trend list, or its own ranking) and writes the draft to `drafts/`.

use async_trait::async_trait;
use serde_json::Value;

use super::agent::{input_str, Agent, ExecutionInput, StepOptions, StepResult};
use super::artifact_registry::{to_output, DraftArtifact, TrendCandidate};
use super::researcher_skill::ResearcherSkill;
use super::text_helpers::word_count;
use crate::state::io::{slugify, write_project_file};

const TEMPLATE: &str = include_str!("defaults/draft.md");
const DEFAULT_TOPIC: &str = "the news cycle";
const DEFAULT_TARGET_WORDS: usize = 250;
const SECTIONS: [&str; 4] = ["headline", "lede", "body", "kicker"];

/// Voice of the piece
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Deadpan,
    Absurd,
    MockSerious,
}

impl Tone {
    pub fn parse(s: &str) -> Self {
        match s {
            "absurd" => Self::Absurd,
            "mock-serious" | "mock_serious" => Self::MockSerious,
            _ => Self::Deadpan,
        }
    }

    fn lede(&self, topic: &str, angle: &str) -> String {
        match self {
            Self::Deadpan => format!(
                "Officials confirmed Tuesday that {topic} is proceeding exactly as expected, which is to say badly. {angle}."
            ),
            Self::Absurd => format!(
                "In a development nobody requested, {topic} has declared itself a sovereign nation and issued its own currency. {angle}."
            ),
            Self::MockSerious => format!(
                "This publication has convened its most distinguished panel to address the gravest question of our age: {topic}. {angle}."
            ),
        }
    }

    fn kicker(&self, topic: &str) -> String {
        match self {
            Self::Deadpan => format!(
                "At press time, {topic} had scheduled a follow-up meeting to discuss the meeting."
            ),
            Self::Absurd => format!(
                "At press time, {topic} was seen boarding a hot air balloon with no stated destination."
            ),
            Self::MockSerious => format!(
                "History will judge us, the panel concluded, mostly for how long we spent on {topic}."
            ),
        }
    }
}

/// Body paragraphs, appended in order until the target length is reached
const BODY: &[&str] = &[
    "\"We take {topic} extremely seriously,\" said a spokesperson, reading from a card that also listed lunch options.",
    "A recent survey found that 64 percent of respondents had heard of {topic}, while the remaining 36 percent asked to be removed from the mailing list.",
    "Critics argue the response has been slow, a charge officials dismissed after a brief delay.",
    "Meanwhile, a coalition of concerned citizens has launched a petition, which they describe as the first step in a long process of launching more petitions.",
    "Analysts expect {topic} to remain in the headlines until something louder happens.",
    "When asked for comment, the relevant agency referred questions to a different agency, which referred them back.",
];

#[derive(Debug, Clone, Default)]
pub struct WriterSkill;

impl WriterSkill {
    pub fn new() -> Self {
        Self
    }

    /// Pick the angle to write: accepted trends, then raw trends, then our own ranking
    fn choose_angle(input: &ExecutionInput, topic: &str) -> TrendCandidate {
        for key in ["selectedTrends", "trends"] {
            let first = input
                .get(key)
                .and_then(Value::as_array)
                .and_then(|a| a.first());
            if let Some(first) = first {
                if let Some(candidate) = candidate_from_value(first) {
                    return candidate;
                }
            }
        }
        ResearcherSkill::rank(topic)
            .into_iter()
            .next()
            .unwrap_or_else(|| TrendCandidate {
                title: format!("Everything You Need To Know About {}", topic),
                angle: format!("A straight-faced explainer about {}", topic),
                score: 0,
            })
    }

    /// Render the draft markdown
    pub fn render(
        topic: &str,
        angle: &TrendCandidate,
        tone: Tone,
        target_words: usize,
        dateline: &str,
    ) -> String {
        let mut body = Vec::new();
        for paragraph in BODY {
            if word_count(&body.join(" ")) >= target_words {
                break;
            }
            body.push(paragraph.replace("{topic}", topic));
        }

        TEMPLATE
            .replace("{{headline}}", &angle.title)
            .replace("{{dateline}}", dateline)
            .replace("{{lede}}", &tone.lede(topic, angle.angle.trim_end_matches('.')))
            .replace("{{body}}", &body.join("\n\n"))
            .replace("{{kicker}}", &tone.kicker(topic))
    }
}

fn candidate_from_value(value: &Value) -> Option<TrendCandidate> {
    match value {
        Value::String(title) => Some(TrendCandidate {
            title: title.clone(),
            angle: title.clone(),
            score: 0,
        }),
        Value::Object(_) => serde_json::from_value(value.clone()).ok().or_else(|| {
            let title = value.get("title").and_then(Value::as_str)?.to_string();
            Some(TrendCandidate {
                angle: value
                    .get("angle")
                    .and_then(Value::as_str)
                    .unwrap_or(title.as_str())
                    .to_string(),
                title,
                score: 0,
            })
        }),
        _ => None,
    }
}

#[async_trait]
impl Agent for WriterSkill {
    fn name(&self) -> &str {
        "creative-writer"
    }

    async fn execute(
        &self,
        input: &ExecutionInput,
        options: &StepOptions,
    ) -> anyhow::Result<StepResult> {
        let topic = input_str(input, "topic").unwrap_or(DEFAULT_TOPIC);
        let tone = Tone::parse(options.get_str("tone").unwrap_or("deadpan"));
        let target_words = options
            .get_u64("targetWords")
            .map(|w| w as usize)
            .unwrap_or(DEFAULT_TARGET_WORDS);
        let dateline = options
            .get_str("dateline")
            .map(str::to_string)
            .unwrap_or_else(|| chrono::Utc::now().format("%B %-d, %Y").to_string());

        let angle = Self::choose_angle(input, topic);
        tracing::info!(topic = %topic, headline = %angle.title, ?tone, "Writing draft");

        let mut content = Self::render(topic, &angle, tone, target_words, &dateline);
        if let Some(note) = input_str(input, "manualEdit").filter(|n| !n.trim().is_empty()) {
            content.push_str(&format!("\n> Editor's note: {}\n", note.trim()));
        }

        let relative = options
            .output_path
            .clone()
            .unwrap_or_else(|| format!("drafts/{}.md", slugify(&angle.title)));
        write_project_file(&options.project_path, &relative, &content).await?;

        let artifact = DraftArtifact {
            title: angle.title.clone(),
            word_count: word_count(&content),
            content,
            path: relative,
            sections: SECTIONS.iter().map(|s| s.to_string()).collect(),
        };

        Ok(StepResult::completed(
            format!("Wrote {} words to {}", artifact.word_count, artifact.path),
            to_output(&artifact)?,
        ))
    }
}
