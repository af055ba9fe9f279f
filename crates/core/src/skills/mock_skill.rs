//! # Mock Skill
//!
//! Deterministic stand-in for agents that cannot be resolved. Always succeeds
//! and echoes what it was given so the degraded step is visible in results.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::agent::{Agent, ExecutionInput, StepOptions, StepResult};

#[derive(Debug, Clone)]
pub struct MockSkill {
    requested: String,
}

impl MockSkill {
    /// `requested` is the agent name that could not be resolved
    pub fn new(requested: impl Into<String>) -> Self {
        Self {
            requested: requested.into(),
        }
    }
}

#[async_trait]
impl Agent for MockSkill {
    fn name(&self) -> &str {
        &self.requested
    }

    async fn execute(
        &self,
        input: &ExecutionInput,
        options: &StepOptions,
    ) -> anyhow::Result<StepResult> {
        let mut output = Map::new();
        output.insert("mock".to_string(), Value::Bool(true));
        output.insert("input".to_string(), Value::Object(input.clone()));
        output.insert("options".to_string(), options.to_value());

        Ok(StepResult::completed(
            format!("Mock agent stood in for '{}'", self.requested),
            output,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_echoes_input_and_options() {
        let mut input = Map::new();
        input.insert("topic".to_string(), json!("tax season"));
        let options = StepOptions::new("/proj");

        let result = MockSkill::new("summarizer")
            .execute(&input, &options)
            .await
            .unwrap();

        assert!(result.success);
        assert!(!result.cancelled);
        assert_eq!(result.output["mock"], json!(true));
        assert_eq!(result.output["input"]["topic"], json!("tax season"));
        assert_eq!(result.output["options"]["projectPath"], json!("/proj"));
    }
}
