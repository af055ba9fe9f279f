//! # Pipeline Runner
//!
//! Executes a workflow's steps in order against an evolving input.
//!
//! Per step: resolve the agent, build its options, execute, stop on
//! cancellation, record and merge the output, then consult the gate if the
//! step asks for one and the run is interactive. A checkpoint is written after
//! every step (configurable) and on every terminal transition.

use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

use super::context::{gate_writer, ExecutionContext};
use super::events::{EventKind, PipelineEvent, Reporter, TracingReporter};
use super::gate::{dispatch, ConfirmationGate, RunMode};
use super::outcome::RunOutcome;
use super::status::RunStatus;
use super::terminal_gate::TerminalGate;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::skills::{
    AgentId, AgentRegistry, AgentResolver, ExecutionInput, Resolution, StepOptions,
};
use crate::state::io::run_state_path;
use crate::state::run_state::PipelineRunState;
use crate::state::workflow::{StepSpec, WorkflowDefinition, WorkflowStore};

/// Sequential workflow executor for one project
pub struct Pipeline {
    project_path: PathBuf,
    workflow_name: String,
    mode: RunMode,
    config: PipelineConfig,
    /// Inline definition used instead of a store lookup
    definition: Option<WorkflowDefinition>,
    resolver: AgentResolver,
    gate: Arc<dyn ConfirmationGate>,
    reporter: Arc<dyn Reporter>,
    status: RunStatus,
    context: ExecutionContext,
}

impl Pipeline {
    /// Pipeline over the default agents, prompting on the terminal
    pub fn new(
        project_path: impl Into<PathBuf>,
        workflow: impl Into<String>,
        mode: RunMode,
    ) -> Self {
        Self {
            project_path: project_path.into(),
            workflow_name: workflow.into(),
            mode,
            config: PipelineConfig::default(),
            definition: None,
            resolver: AgentResolver::new(AgentRegistry::with_defaults()),
            gate: Arc::new(TerminalGate::stdio()),
            reporter: Arc::new(TracingReporter),
            status: RunStatus::Idle,
            context: ExecutionContext::default(),
        }
    }

    pub fn with_gate(mut self, gate: Arc<dyn ConfirmationGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Replace the agent registry. Clears the resolution cache.
    pub fn with_registry(mut self, registry: AgentRegistry) -> Self {
        self.resolver = AgentResolver::new(registry);
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Run this definition instead of looking the workflow up by name
    pub fn with_workflow(mut self, definition: WorkflowDefinition) -> Self {
        self.workflow_name = definition.name.clone();
        self.definition = Some(definition);
        self
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Input as it stands after the last executed step
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Load and validate the workflow this pipeline runs
    pub async fn load_workflow(&self) -> PipelineResult<WorkflowDefinition> {
        match &self.definition {
            Some(definition) => {
                definition.validate()?;
                Ok(definition.clone())
            }
            None => WorkflowStore::new(&self.project_path, &self.config.workflow_dirs)
                .load(&self.workflow_name)
                .await,
        }
    }

    /// Run the workflow from the first step
    #[tracing::instrument(skip(self, seed), fields(workflow = %self.workflow_name, mode = ?self.mode))]
    pub async fn run(&mut self, seed: ExecutionInput) -> PipelineResult<RunOutcome> {
        let workflow = self.load_workflow().await?;

        self.status = RunStatus::Idle;
        self.status.advance(RunStatus::Running);
        let mut state = PipelineRunState::start(&workflow.name, seed.clone());
        self.context = ExecutionContext::new(seed);
        // Replaces any checkpoint left by an earlier run
        self.checkpoint(&state).await?;

        tracing::info!(steps = workflow.steps.len(), "Starting pipeline");
        self.reporter.report(
            &PipelineEvent::new(EventKind::RunStarted)
                .with_message(format!("Running '{}'", workflow.name))
                .with_data(json!({"workflow": workflow.name, "steps": workflow.steps.len()})),
        );

        self.execute_from(&workflow, 0, &mut state).await
    }

    /// Continue a paused (or crashed) run from its checkpoint
    #[tracing::instrument(skip(self), fields(project = %self.project_path.display()))]
    pub async fn resume(&mut self) -> PipelineResult<RunOutcome> {
        let mut state = PipelineRunState::load(&self.project_path)
            .await?
            .ok_or_else(|| PipelineError::NothingToResume(run_state_path(&self.project_path)))?;

        if !state.status.is_resumable() {
            return Err(PipelineError::NotResumable {
                status: state.status.to_string(),
            });
        }

        if self.definition.is_none() {
            if let Some(name) = &state.workflow {
                self.workflow_name = name.clone();
            }
        }
        let workflow = self.load_workflow().await?;
        let start = resume_index(&workflow, &state)?;

        self.context = ExecutionContext::rebuild(
            state.seed.clone().unwrap_or_default(),
            &state.results,
            &state.gate_inputs,
        );
        self.status = RunStatus::Paused;
        self.status.advance(RunStatus::Running);
        state.status = RunStatus::Running;

        tracing::info!(start, steps = workflow.steps.len(), "Resuming pipeline");
        self.reporter.report(
            &PipelineEvent::new(EventKind::RunResumed)
                .with_message(format!("Resuming '{}' at step {}", workflow.name, start + 1))
                .with_data(json!({"workflow": workflow.name, "start": start})),
        );

        self.execute_from(&workflow, start, &mut state).await
    }

    async fn execute_from(
        &mut self,
        workflow: &WorkflowDefinition,
        start: usize,
        state: &mut PipelineRunState,
    ) -> PipelineResult<RunOutcome> {
        for (index, step) in workflow.steps.iter().enumerate().skip(start) {
            state.current_step = index;
            self.reporter.report(
                &PipelineEvent::for_step(EventKind::StepStarted, index, step)
                    .with_message(format!(
                        "Step {}/{}: {}",
                        index + 1,
                        workflow.steps.len(),
                        step.label()
                    )),
            );

            let resolved = self.resolver.resolve(&step.agent_name);
            if resolved.resolution.is_fallback() {
                self.reporter.report(
                    &PipelineEvent::for_step(EventKind::AgentFallback, index, step)
                        .with_message(format!("'{}' replaced by mock agent", step.agent_name))
                        .with_data(serde_json::to_value(&resolved.resolution).unwrap_or_default()),
                );
            }

            let options = self.options_for(step, &resolved.resolution);
            let input = self.context.view_for(step);
            tracing::info!(step = index, id = %step.id(), agent = %resolved.agent.name(), "Executing step");

            let result = match resolved.agent.execute(&input, &options).await {
                Ok(result) => result,
                Err(e) => {
                    return self
                        .finish_failed(index, step, format!("{:#}", e), state)
                        .await;
                }
            };

            if result.cancelled {
                tracing::info!(step = index, id = %step.id(), "Agent cancelled the run");
                self.transition(RunStatus::Cancelled, state);
                self.checkpoint(state).await?;
                self.reporter.report(
                    &PipelineEvent::for_step(EventKind::RunCancelled, index, step)
                        .with_message(result.message.clone()),
                );
                return Ok(RunOutcome::Cancelled {
                    step: index,
                    results: state.results.clone(),
                });
            }

            for collision in self.context.absorb(step.id(), &result.output) {
                tracing::warn!(
                    key = %collision.key,
                    previous = %collision.previous,
                    step = %collision.overwritten_by,
                    "Step output overwrote an existing input key"
                );
                self.reporter.report(
                    &PipelineEvent::for_step(EventKind::KeyCollision, index, step)
                        .with_message(format!(
                            "'{}' from {} overwritten",
                            collision.key, collision.previous
                        ))
                        .with_data(serde_json::to_value(&collision).unwrap_or_default()),
                );
            }
            let message = result.message.clone();
            state.results.insert(step.id().to_string(), result);
            tracing::info!(step = index, id = %step.id(), "Step completed");
            self.reporter.report(
                &PipelineEvent::for_step(EventKind::StepCompleted, index, step).with_message(message),
            );

            if step.requires_confirmation && self.mode != RunMode::Auto {
                self.reporter.report(
                    &PipelineEvent::for_step(EventKind::GateOpened, index, step)
                        .with_data(json!({"kind": step.confirmation_kind})),
                );

                let recorded = &state.results[step.id()];
                let outcome = match dispatch(self.gate.as_ref(), step, recorded).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        return self
                            .finish_failed(
                                index,
                                step,
                                format!("confirmation failed: {:#}", e),
                                state,
                            )
                            .await;
                    }
                };

                self.reporter.report(
                    &PipelineEvent::for_step(EventKind::GateResolved, index, step)
                        .with_message(outcome.action.clone()),
                );

                if !outcome.proceed {
                    tracing::info!(step = index, action = %outcome.action, "Gate declined, pausing");
                    self.transition(RunStatus::Paused, state);
                    self.checkpoint(state).await?;
                    self.reporter.report(
                        &PipelineEvent::for_step(EventKind::RunPaused, index, step)
                            .with_message(format!(
                                "Paused after '{}' ({})",
                                step.label(),
                                outcome.action
                            )),
                    );
                    return Ok(RunOutcome::Paused {
                        step: index,
                        results: state.results.clone(),
                    });
                }

                if !outcome.surfaced.is_empty() {
                    self.context.absorb(&gate_writer(step.id()), &outcome.surfaced);
                    state
                        .gate_inputs
                        .insert(step.id().to_string(), outcome.surfaced);
                }
            }

            if self.config.checkpoint_every_step {
                self.checkpoint(state).await?;
            }
        }

        self.transition(RunStatus::Completed, state);
        self.checkpoint(state).await?;
        tracing::info!(steps = state.results.len(), "Pipeline completed");
        self.reporter.report(
            &PipelineEvent::new(EventKind::RunCompleted)
                .with_message(format!("{} step(s) completed", state.results.len())),
        );

        Ok(RunOutcome::Completed {
            results: state.results.clone(),
        })
    }

    async fn finish_failed(
        &mut self,
        index: usize,
        step: &StepSpec,
        error: String,
        state: &mut PipelineRunState,
    ) -> PipelineResult<RunOutcome> {
        tracing::error!(step = index, id = %step.id(), error = %error, "Step failed");
        self.transition(RunStatus::Error, state);
        self.checkpoint(state).await?;
        self.reporter.report(
            &PipelineEvent::for_step(EventKind::RunFailed, index, step).with_message(error.clone()),
        );
        Ok(RunOutcome::Failed {
            step: index,
            error,
            results: state.results.clone(),
        })
    }

    fn transition(&mut self, next: RunStatus, state: &mut PipelineRunState) {
        self.status.advance(next);
        state.status = self.status;
    }

    async fn checkpoint(&self, state: &PipelineRunState) -> PipelineResult<()> {
        state.save(&self.project_path).await?;
        Ok(())
    }

    /// `{projectPath, outputPath, ...step.options}` plus configured defaults
    /// for the writer and editor when the step does not set them
    fn options_for(&self, step: &StepSpec, resolution: &Resolution) -> StepOptions {
        let mut options = StepOptions::for_step(&self.project_path, step);
        let default = match resolution {
            Resolution::Registered {
                id: AgentId::CreativeWriter,
            } => self.config.target_words.map(|w| ("targetWords", w)),
            Resolution::Registered { id: AgentId::Editor } => {
                self.config.max_suggestions.map(|m| ("maxSuggestions", m))
            }
            _ => None,
        };
        if let Some((key, value)) = default {
            options
                .extra
                .entry(key.to_string())
                .or_insert(Value::from(value));
        }
        options
    }
}

/// First step to execute when resuming: the one after the last recorded result
fn resume_index(workflow: &WorkflowDefinition, state: &PipelineRunState) -> PipelineResult<usize> {
    let len = workflow.steps.len();
    let mismatch = |step: usize| PipelineError::CheckpointMismatch {
        workflow: workflow.name.clone(),
        step,
        len,
    };

    if state.results.len() > len || state.current_step >= len {
        return Err(mismatch(state.current_step));
    }
    for (index, recorded) in state.results.keys().enumerate() {
        if workflow.steps[index].id() != recorded {
            return Err(mismatch(index));
        }
    }
    Ok(state.results.len())
}
