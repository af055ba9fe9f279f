//! # Workflow Definitions
//!
//! Declarative workflow documents and the store that loads them by name.
//!
//! Lookup order for a name:
//! 1. `<project>/.lampoon/workflows/<name>.json`
//! 2. each configured workflow directory
//! 3. built-in workflows (`full`, `quick`)

use crate::error::{PipelineError, PipelineResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const BUILTIN_FULL: &str = include_str!("defaults/full.json");
const BUILTIN_QUICK: &str = include_str!("defaults/quick.json");

/// Which confirmation gate variant a step uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationKind {
    /// Review the candidate trend list
    Trends,
    /// Review editorial suggestions
    Suggestions,
    /// Plain yes/no
    #[default]
    Default,
}

/// One step of a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StepSpec {
    /// Agent to invoke (e.g. "creative-writer")
    #[serde(rename = "agent")]
    pub agent_name: String,
    /// Key under which the result is recorded; defaults to the agent name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    /// Human label
    #[serde(rename = "name", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "confirm", default)]
    pub requires_confirmation: bool,
    #[serde(rename = "confirmType", default)]
    pub confirmation_kind: ConfirmationKind,
    #[serde(
        rename = "confirmMessage",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub confirmation_message: Option<String>,
    /// Merged into the per-step execution options
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
    /// Destination hint passed through to the agent
    #[serde(rename = "output", default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    /// Input keys this step consumes. Empty means the whole input.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reads: Vec<String>,
}

impl StepSpec {
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            id: None,
            display_name: None,
            requires_confirmation: false,
            confirmation_kind: ConfirmationKind::Default,
            confirmation_message: None,
            options: Map::new(),
            output_path: None,
            reads: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_confirmation(mut self, kind: ConfirmationKind) -> Self {
        self.requires_confirmation = true;
        self.confirmation_kind = kind;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.confirmation_message = Some(message.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    pub fn with_reads<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reads = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Result key for this step
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.agent_name)
    }

    /// Label for progress output
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or_else(|| self.id())
    }
}

/// A named, ordered list of steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub steps: Vec<StepSpec>,
}

impl WorkflowDefinition {
    pub fn new(name: impl Into<String>, steps: Vec<StepSpec>) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps,
        }
    }

    /// Parse a workflow document. `name` is used when the document omits one.
    pub fn from_json(name: &str, content: &str) -> PipelineResult<Self> {
        let mut value: Value =
            serde_json::from_str(content).map_err(|e| PipelineError::MalformedWorkflow {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        if let Value::Object(map) = &mut value {
            map.entry("name")
                .or_insert_with(|| Value::String(name.to_string()));
        }

        let workflow: WorkflowDefinition =
            serde_json::from_value(value).map_err(|e| PipelineError::MalformedWorkflow {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        workflow.validate()?;
        Ok(workflow)
    }

    /// Non-empty, unique step ids, non-blank agent names
    pub fn validate(&self) -> PipelineResult<()> {
        if self.steps.is_empty() {
            return Err(PipelineError::EmptyWorkflow(self.name.clone()));
        }

        let mut seen = HashSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            if step.agent_name.trim().is_empty() {
                return Err(PipelineError::MalformedWorkflow {
                    name: self.name.clone(),
                    reason: format!("step {} has an empty agent name", index),
                });
            }
            if !seen.insert(step.id()) {
                return Err(PipelineError::MalformedWorkflow {
                    name: self.name.clone(),
                    reason: format!("duplicate step id '{}'", step.id()),
                });
            }
        }

        Ok(())
    }

    /// JSON schema of the workflow document format
    pub fn json_schema() -> Value {
        serde_json::to_value(schemars::schema_for!(WorkflowDefinition)).unwrap_or(Value::Null)
    }
}

/// Where a listed workflow came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowSource {
    Project,
    Directory(PathBuf),
    Builtin,
}

/// Entry returned by `WorkflowStore::list`
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowListing {
    pub name: String,
    pub source: WorkflowSource,
}

/// Loads workflow documents by name from flat files and built-ins
#[derive(Debug, Clone)]
pub struct WorkflowStore {
    search_dirs: Vec<(PathBuf, WorkflowSource)>,
}

impl WorkflowStore {
    /// Store rooted at a project, with extra directories searched after it
    pub fn new(project_path: &Path, extra_dirs: &[PathBuf]) -> Self {
        let mut search_dirs = vec![(
            super::io::workflows_dir(project_path),
            WorkflowSource::Project,
        )];
        search_dirs.extend(
            extra_dirs
                .iter()
                .map(|d| (d.clone(), WorkflowSource::Directory(d.clone()))),
        );
        Self { search_dirs }
    }

    /// Load a workflow by name
    pub async fn load(&self, name: &str) -> PipelineResult<WorkflowDefinition> {
        validate_name(name)?;
        let file_name = format!("{}.json", name);

        for (dir, _) in &self.search_dirs {
            let path = dir.join(&file_name);
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(PipelineError::MalformedWorkflow {
                        name: name.to_string(),
                        reason: format!("{}: {}", path.display(), e),
                    })
                }
            };
            tracing::debug!(workflow = %name, path = %path.display(), "Loaded workflow");
            return WorkflowDefinition::from_json(name, &content);
        }

        if let Some(content) = builtin(name) {
            return WorkflowDefinition::from_json(name, content);
        }

        Err(PipelineError::WorkflowNotFound {
            name: name.to_string(),
            searched: self
                .search_dirs
                .iter()
                .map(|(d, _)| d.display().to_string())
                .chain(std::iter::once("built-ins".to_string()))
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// All workflow names visible to this store. Earlier sources shadow later ones.
    pub async fn list(&self) -> Vec<WorkflowListing> {
        let mut seen = HashSet::new();
        let mut listings = Vec::new();

        for (dir, source) in &self.search_dirs {
            let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
                continue;
            };
            let mut names = Vec::new();
            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                if path.extension().map(|e| e == "json").unwrap_or(false) {
                    if let Some(stem) = path.file_stem() {
                        names.push(stem.to_string_lossy().to_string());
                    }
                }
            }
            names.sort();

            for name in names {
                if seen.insert(name.clone()) {
                    listings.push(WorkflowListing {
                        name,
                        source: source.clone(),
                    });
                }
            }
        }

        for name in ["full", "quick"] {
            if seen.insert(name.to_string()) {
                listings.push(WorkflowListing {
                    name: name.to_string(),
                    source: WorkflowSource::Builtin,
                });
            }
        }

        listings
    }
}

/// Workflow names are bare file stems
fn validate_name(name: &str) -> PipelineResult<()> {
    let bad = name.trim().is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || Path::new(name).components().count() != 1;
    if bad {
        return Err(PipelineError::MalformedWorkflow {
            name: name.to_string(),
            reason: "workflow names cannot contain path separators".to_string(),
        });
    }
    Ok(())
}

fn builtin(name: &str) -> Option<&'static str> {
    match name {
        "full" => Some(BUILTIN_FULL),
        "quick" => Some(BUILTIN_QUICK),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_parse() {
        let full = WorkflowDefinition::from_json("full", BUILTIN_FULL).unwrap();
        assert_eq!(full.steps.len(), 4);
        assert_eq!(full.steps[0].confirmation_kind, ConfirmationKind::Trends);
        assert!(full.steps[0].requires_confirmation);
        assert_eq!(full.steps[1].id(), "draft");

        let quick = WorkflowDefinition::from_json("quick", BUILTIN_QUICK).unwrap();
        assert!(quick.steps.iter().all(|s| !s.requires_confirmation));
    }

    #[test]
    fn test_step_defaults() {
        let json = r#"{"steps": [{"agent": "editor"}]}"#;
        let workflow = WorkflowDefinition::from_json("solo", json).unwrap();
        assert_eq!(workflow.name, "solo");

        let step = &workflow.steps[0];
        assert_eq!(step.id(), "editor");
        assert_eq!(step.label(), "editor");
        assert!(!step.requires_confirmation);
        assert_eq!(step.confirmation_kind, ConfirmationKind::Default);
        assert!(step.options.is_empty());
    }

    #[test]
    fn test_empty_workflow_rejected() {
        let err = WorkflowDefinition::from_json("empty", r#"{"steps": []}"#).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyWorkflow(_)));
    }

    #[test]
    fn test_malformed_workflow_rejected() {
        let err = WorkflowDefinition::from_json("bad", "{ not json").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedWorkflow { .. }));

        let err = WorkflowDefinition::from_json(
            "bad",
            r#"{"steps": [{"agent": "editor", "confirmType": "maybe"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedWorkflow { .. }));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"{"steps": [{"agent": "editor"}, {"agent": "editor"}]}"#;
        let err = WorkflowDefinition::from_json("dup", json).unwrap_err();
        assert!(err.to_string().contains("duplicate step id"));
    }

    #[tokio::test]
    async fn test_store_prefers_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let workflows = super::super::io::workflows_dir(dir.path());
        std::fs::create_dir_all(&workflows).unwrap();
        std::fs::write(
            workflows.join("quick.json"),
            r#"{"name": "quick", "steps": [{"agent": "editor", "id": "only"}]}"#,
        )
        .unwrap();

        let store = WorkflowStore::new(dir.path(), &[]);
        let quick = store.load("quick").await.unwrap();
        assert_eq!(quick.steps.len(), 1);
        assert_eq!(quick.steps[0].id(), "only");

        let listing = store.list().await;
        let quick_entry = listing.iter().find(|l| l.name == "quick").unwrap();
        assert_eq!(quick_entry.source, WorkflowSource::Project);
        assert!(listing
            .iter()
            .any(|l| l.name == "full" && l.source == WorkflowSource::Builtin));
    }

    #[tokio::test]
    async fn test_store_missing_workflow() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkflowStore::new(dir.path(), &[]);
        let err = store.load("nope").await.unwrap_err();
        assert!(matches!(err, PipelineError::WorkflowNotFound { .. }));
    }

    #[tokio::test]
    async fn test_store_rejects_names_outside_workflow_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let workflows = super::super::io::workflows_dir(dir.path());
        std::fs::create_dir_all(&workflows).unwrap();
        std::fs::write(
            dir.path().join("escape.json"),
            r#"{"steps": [{"agent": "editor"}]}"#,
        )
        .unwrap();

        let store = WorkflowStore::new(dir.path(), &[]);
        for name in ["../../escape", "../escape", "a/b", "a\\b", "..", ""] {
            let err = store.load(name).await.unwrap_err();
            assert!(
                matches!(err, PipelineError::MalformedWorkflow { .. }),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_schema_mentions_steps() {
        let schema = WorkflowDefinition::json_schema();
        assert!(schema.to_string().contains("steps"));
    }
}
