//! # Errors
//!
//! Typed errors surfaced at the library boundary. Operations inside agents and
//! file I/O use `anyhow` with context; the pipeline converts step-level faults
//! into a `RunOutcome` and only configuration and state faults escape as errors.

use std::path::PathBuf;
use thiserror::Error;

/// Faults that abort a run before any step executes
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No workflow document or built-in with this name
    #[error("workflow '{name}' not found (searched: {searched})")]
    WorkflowNotFound { name: String, searched: String },

    /// The workflow document exists but does not parse
    #[error("workflow '{name}' is malformed: {reason}")]
    MalformedWorkflow { name: String, reason: String },

    /// A workflow must have at least one step
    #[error("workflow '{0}' has no steps")]
    EmptyWorkflow(String),

    /// `resume()` found no checkpoint to resume from
    #[error("no run to resume in {0}")]
    NothingToResume(PathBuf),

    /// The checkpoint is in a terminal state
    #[error("run is {status} and cannot be resumed")]
    NotResumable { status: String },

    /// The checkpointed workflow no longer matches the loaded definition
    #[error("checkpoint step {step} is out of range for workflow '{workflow}' ({len} steps)")]
    CheckpointMismatch {
        workflow: String,
        step: usize,
        len: usize,
    },

    #[error(transparent)]
    State(#[from] StateError),
}

/// Faults reading or writing flat-file project state
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PipelineError::EmptyWorkflow("quick".to_string());
        assert_eq!(err.to_string(), "workflow 'quick' has no steps");

        let err = PipelineError::NotResumable {
            status: "completed".to_string(),
        };
        assert!(err.to_string().contains("completed"));
    }
}
