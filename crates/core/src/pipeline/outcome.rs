//! # Run Outcome
//!
//! How a call to `run()` or `resume()` ended. Every variant carries the
//! results recorded so far, in execution order.

use indexmap::IndexMap;
use serde::Serialize;

use super::status::RunStatus;
use crate::skills::StepResult;

pub type StepResults = IndexMap<String, StepResult>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed {
        results: StepResults,
    },
    /// A gate declined at `step`; its result is kept and the run can resume
    Paused {
        step: usize,
        results: StepResults,
    },
    /// The agent at `step` reported cancellation; its result is not recorded
    Cancelled {
        step: usize,
        results: StepResults,
    },
    /// The step at `step` faulted
    Failed {
        step: usize,
        error: String,
        results: StepResults,
    },
}

impl RunOutcome {
    pub fn status(&self) -> RunStatus {
        match self {
            Self::Completed { .. } => RunStatus::Completed,
            Self::Paused { .. } => RunStatus::Paused,
            Self::Cancelled { .. } => RunStatus::Cancelled,
            Self::Failed { .. } => RunStatus::Error,
        }
    }

    pub fn results(&self) -> &StepResults {
        match self {
            Self::Completed { results }
            | Self::Paused { results, .. }
            | Self::Cancelled { results, .. }
            | Self::Failed { results, .. } => results,
        }
    }

    /// Step index the run stopped at, if it stopped early
    pub fn stopped_at(&self) -> Option<usize> {
        match self {
            Self::Completed { .. } => None,
            Self::Paused { step, .. }
            | Self::Cancelled { step, .. }
            | Self::Failed { step, .. } => Some(*step),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let mut results = StepResults::new();
        results.insert("draft".to_string(), StepResult::default());

        let paused = RunOutcome::Paused {
            step: 0,
            results: results.clone(),
        };
        assert_eq!(paused.status(), RunStatus::Paused);
        assert_eq!(paused.stopped_at(), Some(0));
        assert_eq!(paused.results().len(), 1);

        let done = RunOutcome::Completed { results };
        assert!(done.is_completed());
        assert_eq!(done.stopped_at(), None);
    }
}
