//! # Pipeline Events
//!
//! Progress events emitted by the pipeline and the `Reporter` seam that
//! receives them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(test)]
use std::sync::Mutex;

use crate::state::workflow::StepSpec;

/// Kind of pipeline event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RunStarted,
    /// A checkpoint was picked up again
    RunResumed,
    StepStarted,
    StepCompleted,
    /// The step's agent could not be resolved; the mock stands in
    AgentFallback,
    /// A step overwrote a key already in the execution input
    KeyCollision,
    GateOpened,
    GateResolved,
    RunPaused,
    RunCancelled,
    RunFailed,
    RunCompleted,
}

/// An event in a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    /// Step index, when the event belongs to a step
    #[serde(default)]
    pub step: Option<usize>,
    #[serde(default)]
    pub step_id: Option<String>,
    /// Display label of the step
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl PipelineEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            step: None,
            step_id: None,
            label: None,
            message: None,
            data: None,
        }
    }

    /// Event tied to a workflow step
    pub fn for_step(kind: EventKind, index: usize, step: &StepSpec) -> Self {
        Self {
            step: Some(index),
            step_id: Some(step.id().to_string()),
            label: Some(step.label().to_string()),
            ..Self::new(kind)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Receives pipeline events as they happen
pub trait Reporter: Send + Sync {
    fn report(&self, event: &PipelineEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: &PipelineEvent) {
        let step_id = event.step_id.as_deref().unwrap_or("-");
        let message = event.message.as_deref().unwrap_or("");
        match event.kind {
            EventKind::AgentFallback | EventKind::KeyCollision => {
                tracing::warn!(kind = ?event.kind, step = %step_id, "{}", message)
            }
            EventKind::RunFailed => {
                tracing::error!(kind = ?event.kind, step = %step_id, "{}", message)
            }
            _ => tracing::debug!(kind = ?event.kind, step = %step_id, "{}", message),
        }
    }
}

/// Keeps every event in memory for assertions in tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<PipelineEvent>>,
}

#[cfg(test)]
impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().iter().map(|e| e.kind).collect()
    }
}

#[cfg(test)]
impl Reporter for RecordingReporter {
    fn report(&self, event: &PipelineEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_event_carries_step_identity() {
        let step = StepSpec::new("editor").with_id("edit");
        let event = PipelineEvent::for_step(EventKind::StepStarted, 3, &step)
            .with_message("starting");

        assert_eq!(event.step, Some(3));
        assert_eq!(event.step_id.as_deref(), Some("edit"));
        assert_eq!(event.message.as_deref(), Some("starting"));
    }

    #[test]
    fn test_recording_reporter_keeps_order() {
        let reporter = RecordingReporter::new();
        reporter.report(&PipelineEvent::new(EventKind::RunStarted));
        reporter.report(&PipelineEvent::new(EventKind::RunCompleted));

        assert_eq!(
            reporter.kinds(),
            vec![EventKind::RunStarted, EventKind::RunCompleted]
        );
    }

    #[test]
    fn test_event_kind_serialization() {
        let json = serde_json::to_string(&EventKind::KeyCollision).unwrap();
        assert_eq!(json, "\"key_collision\"");
    }
}
