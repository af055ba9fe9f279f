//! # Pipeline
//!
//! Sequential workflow execution with confirmation gates, checkpointing and
//! pause/resume.

pub mod context;
pub mod events;
pub mod gate;
pub mod outcome;
pub mod runner;
pub mod scripted_gate;
pub mod status;
pub mod terminal_gate;

pub use context::{ExecutionContext, KeyCollision};
pub use events::{EventKind, PipelineEvent, Reporter, TracingReporter};
pub use gate::{
    ConfirmationGate, GateOutcome, RunMode, SuggestionAction, SuggestionDecision, TrendAction,
    TrendDecision,
};
pub use outcome::{RunOutcome, StepResults};
pub use runner::Pipeline;
pub use scripted_gate::ScriptedGate;
pub use status::RunStatus;
pub use terminal_gate::TerminalGate;
