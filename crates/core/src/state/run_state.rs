//! # Run State
//!
//! The checkpoint written to `.lampoon/run_state.json` after every step and on
//! every terminal transition. Absence of the file means no prior run.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tokio::fs;

use super::io::run_state_path;
use crate::error::StateError;
use crate::pipeline::RunStatus;
use crate::skills::{ExecutionInput, StepResult};

/// Persisted progress of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunState {
    /// Index of the step being executed or last executed
    pub current_step: usize,
    pub status: RunStatus,
    /// Step id -> result, in execution order
    #[serde(default)]
    pub results: IndexMap<String, StepResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    /// Initial input the run was seeded with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<ExecutionInput>,
    /// Fields surfaced by confirmation gates, keyed by the gated step's id
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub gate_inputs: IndexMap<String, Map<String, Value>>,
}

impl PipelineRunState {
    /// Fresh state for a run that is about to start
    pub fn start(workflow: &str, seed: ExecutionInput) -> Self {
        Self {
            current_step: 0,
            status: RunStatus::Running,
            results: IndexMap::new(),
            workflow: Some(workflow.to_string()),
            seed: Some(seed),
            gate_inputs: IndexMap::new(),
        }
    }

    /// Write the checkpoint, creating `.lampoon/` if needed
    pub async fn save(&self, project_path: &Path) -> Result<(), StateError> {
        let path = run_state_path(project_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StateError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)
            .await
            .map_err(|source| StateError::Write { path, source })
    }

    /// Read the checkpoint. `None` when no run has been recorded.
    pub async fn load(project_path: &Path) -> Result<Option<Self>, StateError> {
        let path = run_state_path(project_path);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StateError::Read { path, source }),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StateError::Parse { path, source })
    }

    /// Remove the checkpoint. Missing file is not an error.
    pub async fn clear(project_path: &Path) -> Result<(), StateError> {
        let path = run_state_path(project_path);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StateError::Write { path, source }),
        }
    }
}
