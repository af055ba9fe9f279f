//! # Project State
//!
//! Project metadata (`.lampoon/project.json`) and the store that owns a
//! project directory: layout creation, status summaries and the run
//! checkpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::io::{count_files, ensure_layout, project_file_path, CONTENT_DIRS};
use super::run_state::PipelineRunState;
use crate::error::StateError;
use crate::pipeline::RunStatus;

/// Where the project is in its life
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectPhase {
    #[default]
    Created,
    Drafting,
    Review,
    Complete,
}

impl ProjectPhase {
    /// Phase implied by how a run ended
    pub fn after_run(status: RunStatus) -> Self {
        match status {
            RunStatus::Completed => Self::Complete,
            RunStatus::Paused => Self::Review,
            _ => Self::Drafting,
        }
    }
}

/// The metadata document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectState {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub phase: ProjectPhase,
}

impl ProjectState {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            created_at: now,
            updated_at: now,
            phase: ProjectPhase::Created,
        }
    }
}

/// Artifact counts and run status for a project
#[derive(Debug, Clone, Serialize)]
pub struct ProjectStatus {
    pub project: Option<ProjectState>,
    /// (subtree, file count) for each content directory
    pub artifacts: Vec<(String, usize)>,
    pub run: Option<RunSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub workflow: Option<String>,
    pub status: RunStatus,
    pub current_step: usize,
    pub completed_steps: Vec<String>,
}

/// Flat-file store rooted at a project directory
#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory layout and metadata. An existing project keeps
    /// its metadata.
    pub async fn init(&self, name: &str) -> anyhow::Result<ProjectState> {
        ensure_layout(&self.root).await?;

        if let Some(existing) = self.load().await? {
            tracing::info!(project = %existing.name, "Project already initialized");
            return Ok(existing);
        }

        let state = ProjectState::new(name);
        self.save(&state).await?;
        tracing::info!(project = %name, root = ?self.root, "Initialized project");
        Ok(state)
    }

    pub async fn load(&self) -> Result<Option<ProjectState>, StateError> {
        let path = project_file_path(&self.root);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)
                .map(Some)
                .map_err(|source| StateError::Parse { path, source }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StateError::Read { path, source }),
        }
    }

    /// Write the metadata, bumping `updated_at`
    pub async fn save(&self, state: &ProjectState) -> Result<(), StateError> {
        let mut state = state.clone();
        state.updated_at = Utc::now();

        let path = project_file_path(&self.root);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StateError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let content = serde_json::to_string_pretty(&state)?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|source| StateError::Write { path, source })
    }

    /// Record a phase change. No-op for uninitialized projects.
    pub async fn set_phase(&self, phase: ProjectPhase) -> Result<(), StateError> {
        if let Some(mut state) = self.load().await? {
            state.phase = phase;
            self.save(&state).await?;
        }
        Ok(())
    }

    pub async fn load_run(&self) -> Result<Option<PipelineRunState>, StateError> {
        PipelineRunState::load(&self.root).await
    }

    pub async fn clear_run(&self) -> Result<(), StateError> {
        PipelineRunState::clear(&self.root).await
    }

    pub async fn status(&self) -> Result<ProjectStatus, StateError> {
        let artifacts = CONTENT_DIRS
            .iter()
            .map(|dir| (dir.to_string(), count_files(&self.root, dir)))
            .collect();

        let run = self.load_run().await?.map(|run| RunSummary {
            workflow: run.workflow.clone(),
            status: run.status,
            current_step: run.current_step,
            completed_steps: run.results.keys().cloned().collect(),
        });

        Ok(ProjectStatus {
            project: self.load().await?,
            artifacts,
            run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::StepResult;
    use serde_json::Map;

    #[tokio::test]
    async fn test_init_creates_layout_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path());

        let first = store.init("weekly").await.unwrap();
        for sub in CONTENT_DIRS {
            assert!(dir.path().join(sub).is_dir(), "{} missing", sub);
        }

        let second = store.init("renamed").await.unwrap();
        assert_eq!(second.name, "weekly");
        assert_eq!(second.created_at, first.created_at);
    }

    #[tokio::test]
    async fn test_status_counts_and_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path());
        store.init("weekly").await.unwrap();
        std::fs::write(dir.path().join("drafts/a.md"), "a").unwrap();
        std::fs::write(dir.path().join("drafts/b.md"), "b").unwrap();

        let mut run = PipelineRunState::start("quick", Map::new());
        run.status = RunStatus::Paused;
        run.results
            .insert("draft".to_string(), StepResult::completed("ok", Map::new()));
        run.save(dir.path()).await.unwrap();

        let status = store.status().await.unwrap();
        assert!(status.artifacts.contains(&("drafts".to_string(), 2)));
        assert!(status.artifacts.contains(&("reports".to_string(), 0)));
        let summary = status.run.unwrap();
        assert_eq!(summary.status, RunStatus::Paused);
        assert_eq!(summary.completed_steps, vec!["draft".to_string()]);

        store.clear_run().await.unwrap();
        assert!(store.status().await.unwrap().run.is_none());
    }

    #[tokio::test]
    async fn test_set_phase() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path());

        store.set_phase(ProjectPhase::Review).await.unwrap();
        assert!(store.load().await.unwrap().is_none());

        store.init("weekly").await.unwrap();
        store
            .set_phase(ProjectPhase::after_run(RunStatus::Completed))
            .await
            .unwrap();
        assert_eq!(
            store.load().await.unwrap().unwrap().phase,
            ProjectPhase::Complete
        );
    }
}
