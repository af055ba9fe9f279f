//! # Lampoon Core
//!
//! Workflow runner for a satirical content pipeline: trend research, drafting,
//! rights checking and editorial review, threaded through a single execution
//! input with optional human confirmation between steps.
//!
//! ## Architecture
//!
//! - `skills/` - The agents and the registry that resolves them by name
//! - `pipeline/` - Sequential executor, gates, events, run status
//! - `state/` - Workflow documents, project metadata, run checkpoints
//! - `config` - Layered configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lampoon_core::pipeline::{Pipeline, RunMode};
//!
//! let mut pipeline = Pipeline::new("./my-piece", "full", RunMode::Interactive);
//! let outcome = pipeline.run(seed).await?;
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod skills;
pub mod state;

pub use config::{PersistedConfig, PipelineConfig};
pub use error::{PipelineError, PipelineResult, StateError};
pub use pipeline::{Pipeline, RunMode, RunOutcome, RunStatus};
