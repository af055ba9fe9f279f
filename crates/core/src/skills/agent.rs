//! # Agent Contract
//!
//! The uniform `execute(input, options) -> result` contract every pipeline
//! step implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::state::workflow::StepSpec;

/// Free-form input bag threaded through the pipeline
pub type ExecutionInput = Map<String, Value>;

/// Result of one agent invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    /// Produced fields, merged into the execution input
    #[serde(default)]
    pub output: Map<String, Value>,
    /// The agent aborted mid-step; the pipeline stops
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
}

impl StepResult {
    /// Successful result with output fields
    pub fn completed(message: impl Into<String>, output: Map<String, Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            output,
            cancelled: false,
        }
    }

    /// Cancellation signal
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            output: Map::new(),
            cancelled: true,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.output.insert(key.into(), value);
        self
    }
}

/// Per-step execution options: `{projectPath, outputPath, ...step.options}`
#[derive(Debug, Clone, PartialEq)]
pub struct StepOptions {
    pub project_path: PathBuf,
    pub output_path: Option<String>,
    /// The step's own options
    pub extra: Map<String, Value>,
}

impl StepOptions {
    pub fn new(project_path: impl Into<PathBuf>) -> Self {
        Self {
            project_path: project_path.into(),
            output_path: None,
            extra: Map::new(),
        }
    }

    /// Build options for a workflow step.
    ///
    /// `projectPath` and `outputPath` inside `step.options` are spread last, so
    /// they replace the typed fields rather than sitting beside them in `extra`.
    pub fn for_step(project_path: &Path, step: &StepSpec) -> Self {
        let mut extra = step.options.clone();
        let mut output_path = step.output_path.clone();
        let mut project_path = project_path.to_path_buf();

        if let Some(value) = extra.remove("outputPath") {
            output_path = value.as_str().map(str::to_string);
        }
        if let Some(path) = extra.remove("projectPath") {
            match path.as_str() {
                Some(p) => project_path = PathBuf::from(p),
                None => tracing::warn!(step = %step.id(), "Ignoring non-string projectPath option"),
            }
        }

        Self {
            project_path,
            output_path,
            extra,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.extra.get(key).and_then(Value::as_u64)
    }

    /// JSON view in spread order: `{projectPath, outputPath, ...extra}`
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            "projectPath".to_string(),
            Value::String(self.project_path.to_string_lossy().to_string()),
        );
        map.insert(
            "outputPath".to_string(),
            self.output_path
                .as_ref()
                .map(|p| Value::String(p.clone()))
                .unwrap_or(Value::Null),
        );
        for (k, v) in &self.extra {
            map.insert(k.clone(), v.clone());
        }
        Value::Object(map)
    }
}

/// A unit of pipeline work
///
/// Agents may do blocking I/O or wait on a human; the pipeline awaits each call
/// before starting the next step. Returning `Err` is a step fault and halts the
/// run. Returning a result with `cancelled` stops the run without an error.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Registry name, used in logs and events
    fn name(&self) -> &str;

    async fn execute(
        &self,
        input: &ExecutionInput,
        options: &StepOptions,
    ) -> anyhow::Result<StepResult>;
}

/// Read a string field from the input
pub(crate) fn input_str<'a>(input: &'a ExecutionInput, key: &str) -> Option<&'a str> {
    input.get(key).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::workflow::StepSpec;
    use serde_json::json;

    #[test]
    fn test_options_spread_order() {
        let mut step = StepSpec::new("editor")
            .with_option("maxSuggestions", json!(3))
            .with_option("outputPath", json!("override.md"));
        step.output_path = Some("reviews/x.md".to_string());

        let options = StepOptions::for_step(Path::new("/proj"), &step);
        assert_eq!(options.get_u64("maxSuggestions"), Some(3));
        assert_eq!(options.output_path.as_deref(), Some("override.md"));
        assert!(!options.extra.contains_key("outputPath"));

        let value = options.to_value();
        assert_eq!(value["projectPath"], json!("/proj"));
        assert_eq!(value["outputPath"], json!("override.md"));
        assert_eq!(value["maxSuggestions"], json!(3));
    }

    #[test]
    fn test_path_options_replace_typed_fields() {
        let mut step = StepSpec::new("editor").with_option("outputPath", Value::Null);
        step.output_path = Some("reviews/x.md".to_string());
        let options = StepOptions::for_step(Path::new("/proj"), &step);
        assert_eq!(options.output_path, None);

        let mut step = StepSpec::new("editor").with_option("projectPath", json!("/elsewhere"));
        step.output_path = Some("reviews/x.md".to_string());
        let options = StepOptions::for_step(Path::new("/proj"), &step);
        assert_eq!(options.project_path, PathBuf::from("/elsewhere"));
        assert_eq!(options.output_path.as_deref(), Some("reviews/x.md"));
        assert_eq!(options.to_value()["projectPath"], json!("/elsewhere"));
    }

    #[test]
    fn test_step_result_serialization() {
        let result = StepResult::completed("ok", Map::new()).with_field("x", json!(1));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], json!(true));
        assert!(json.get("cancelled").is_none());

        let cancelled = StepResult::cancelled("stop");
        let json = serde_json::to_value(&cancelled).unwrap();
        assert_eq!(json["cancelled"], json!(true));
    }
}
