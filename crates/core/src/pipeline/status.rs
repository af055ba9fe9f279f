//! # Run Status
//!
//! Lifecycle of a pipeline run.
//!
//! ```text
//! idle -> running -> completed | paused | cancelled | error
//!            ^          |
//!            +-- resume-+
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    /// A gate declined; resumable
    Paused,
    /// An agent reported cancellation
    Cancelled,
    Completed,
    /// A step raised a fault
    Error,
}

impl RunStatus {
    /// Completed, cancelled and error never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Error)
    }

    /// Paused runs, and running checkpoints left behind by a crash
    pub fn is_resumable(&self) -> bool {
        matches!(self, Self::Paused | Self::Running)
    }

    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        match (self, next) {
            (Self::Idle, Self::Running) => true,
            (Self::Paused, Self::Running) => true,
            (
                Self::Running,
                Self::Paused | Self::Cancelled | Self::Completed | Self::Error,
            ) => true,
            _ => false,
        }
    }

    /// Move to `next`, returning false (and staying put) when the move is illegal
    pub fn advance(&mut self, next: RunStatus) -> bool {
        if self.can_transition_to(next) {
            *self = next;
            true
        } else {
            tracing::warn!(from = %self, to = %next, "Ignoring illegal status transition");
            false
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_lifecycle() {
        let mut status = RunStatus::default();
        assert_eq!(status, RunStatus::Idle);

        assert!(status.advance(RunStatus::Running));
        assert!(status.advance(RunStatus::Paused));
        assert!(status.is_resumable());

        assert!(status.advance(RunStatus::Running));
        assert!(status.advance(RunStatus::Completed));
        assert!(status.is_terminal());
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [RunStatus::Completed, RunStatus::Cancelled, RunStatus::Error] {
            let mut status = terminal;
            assert!(!status.advance(RunStatus::Running));
            assert_eq!(status, terminal);
            assert!(!status.is_resumable());
        }
    }

    #[test]
    fn test_idle_cannot_skip_running() {
        let mut status = RunStatus::Idle;
        assert!(!status.advance(RunStatus::Completed));
        assert_eq!(status, RunStatus::Idle);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&RunStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }
}
