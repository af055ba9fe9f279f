//! # Configuration
//!
//! `PipelineConfig` is what a run uses. It is resolved in layers:
//! defaults, then `.lampoon/config.json` (a partial `PersistedConfig`), then
//! `LAMPOON_*` environment variables. The CLI applies its flags last.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::StateError;
use crate::state::io::config_path;

pub const ENV_WORKFLOW: &str = "LAMPOON_WORKFLOW";
pub const ENV_AUTO: &str = "LAMPOON_AUTO";
pub const ENV_WORKFLOW_DIR: &str = "LAMPOON_WORKFLOW_DIR";

/// Resolved configuration for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub default_workflow: String,
    /// Skip every confirmation gate
    pub auto_mode: bool,
    /// Write the checkpoint after every step, not only on terminal transitions
    pub checkpoint_every_step: bool,
    /// Extra directories searched for workflow documents
    pub workflow_dirs: Vec<PathBuf>,
    /// Injected into writer steps that do not set `targetWords`
    pub target_words: Option<u64>,
    /// Injected into editor steps that do not set `maxSuggestions`
    pub max_suggestions: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_workflow: "full".to_string(),
            auto_mode: false,
            checkpoint_every_step: true,
            workflow_dirs: Vec::new(),
            target_words: None,
            max_suggestions: None,
        }
    }
}

impl PipelineConfig {
    /// Defaults, then the project's config file, then the process environment
    pub async fn resolve(project_path: &Path) -> Result<Self, StateError> {
        let persisted = PersistedConfig::load(project_path).await?;
        let mut config = Self::default();
        config.apply(persisted);
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overlay the fields a persisted config sets
    pub fn apply(&mut self, persisted: PersistedConfig) {
        let mut layered = PersistedConfig::from(&*self);
        layered.merge(persisted);
        *self = layered.into_config();
    }

    /// Overlay `LAMPOON_*` variables read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(workflow) = lookup(ENV_WORKFLOW).filter(|w| !w.trim().is_empty()) {
            self.default_workflow = workflow.trim().to_string();
        }
        if let Some(auto) = lookup(ENV_AUTO) {
            self.auto_mode = matches!(
                auto.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(dirs) = lookup(ENV_WORKFLOW_DIR) {
            self.workflow_dirs
                .extend(std::env::split_paths(&dirs).filter(|p| !p.as_os_str().is_empty()));
        }
    }
}

/// Partial configuration as stored in `.lampoon/config.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_workflow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_every_step: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workflow_dirs: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_words: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_suggestions: Option<u64>,
}

impl From<&PipelineConfig> for PersistedConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            default_workflow: Some(config.default_workflow.clone()),
            auto_mode: Some(config.auto_mode),
            checkpoint_every_step: Some(config.checkpoint_every_step),
            workflow_dirs: config.workflow_dirs.clone(),
            target_words: config.target_words,
            max_suggestions: config.max_suggestions,
        }
    }
}

impl PersistedConfig {
    /// Fill unset fields from the defaults
    pub fn into_config(self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            default_workflow: self.default_workflow.unwrap_or(defaults.default_workflow),
            auto_mode: self.auto_mode.unwrap_or(defaults.auto_mode),
            checkpoint_every_step: self
                .checkpoint_every_step
                .unwrap_or(defaults.checkpoint_every_step),
            workflow_dirs: self.workflow_dirs,
            target_words: self.target_words,
            max_suggestions: self.max_suggestions,
        }
    }

    /// Missing file is an empty config
    pub async fn load(project_path: &Path) -> Result<Self, StateError> {
        let path = config_path(project_path);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|source| StateError::Parse { path, source })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(StateError::Read { path, source }),
        }
    }

    pub async fn save(&self, project_path: &Path) -> Result<(), StateError> {
        let path = config_path(project_path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StateError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|source| StateError::Write { path, source })
    }

    /// Fields set in `other` win; directory lists are unioned
    pub fn merge(&mut self, other: PersistedConfig) {
        if other.default_workflow.is_some() {
            self.default_workflow = other.default_workflow;
        }
        if other.auto_mode.is_some() {
            self.auto_mode = other.auto_mode;
        }
        if other.checkpoint_every_step.is_some() {
            self.checkpoint_every_step = other.checkpoint_every_step;
        }
        for dir in other.workflow_dirs {
            if !self.workflow_dirs.contains(&dir) {
                self.workflow_dirs.push(dir);
            }
        }
        if other.target_words.is_some() {
            self.target_words = other.target_words;
        }
        if other.max_suggestions.is_some() {
            self.max_suggestions = other.max_suggestions;
        }
    }
}
