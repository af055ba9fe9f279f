//! # Lampoon Skills
//!
//! The agents a workflow step can name, plus the registry that resolves them.
//!
//! ## Architecture
//!
//! ```text
//! Workflow step ("agent": "editor")
//!   └── AgentResolver (cache, mock fallback)
//!         └── AgentRegistry (AgentId -> factory)
//!               └── Agent::execute(input, options)
//! ```
//!
//! ## Skills
//!
//! - `ResearcherSkill` - Rank satirical angles for a topic
//! - `WriterSkill` - Draft the piece from the chosen angle
//! - `RightsSkill` - Flag trademark, likeness and originality risk
//! - `EditorSkill` - Line-level editorial suggestions
//! - `MockSkill` - Stand-in for anything that fails to resolve

pub mod agent;
pub mod artifact_registry;
pub mod registry;
pub mod text_helpers;

pub mod editor_skill;
pub mod mock_skill;
pub mod researcher_skill;
pub mod rights_skill;
pub mod writer_skill;

pub use agent::{Agent, ExecutionInput, StepOptions, StepResult};
pub use editor_skill::EditorSkill;
pub use mock_skill::MockSkill;
pub use registry::{AgentId, AgentRegistry, AgentResolver, Resolution, ResolvedAgent};
pub use researcher_skill::ResearcherSkill;
pub use rights_skill::RightsSkill;
pub use writer_skill::{Tone, WriterSkill};
