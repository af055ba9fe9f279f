pub mod io;
pub mod project_state;
pub mod run_state;
pub mod workflow;

pub use project_state::{ProjectPhase, ProjectState, ProjectStatus, ProjectStore, RunSummary};
pub use run_state::PipelineRunState;
pub use workflow::{
    ConfirmationKind, StepSpec, WorkflowDefinition, WorkflowListing, WorkflowSource, WorkflowStore,
};
