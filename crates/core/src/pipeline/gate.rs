//! # Confirmation Gates
//!
//! Human-in-the-loop checkpoints after a step. A gate presents the step's
//! output and returns an action; `dispatch` turns that action into a
//! proceed/stop decision plus any fields to surface to the next step.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::skills::StepResult;
use crate::state::workflow::{ConfirmationKind, StepSpec};

/// Whether gates are consulted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Interactive,
    /// Skip every gate
    Auto,
}

/// Response to the trend list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendAction {
    Accept,
    Edit,
    Add,
    Retry,
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendDecision {
    pub action: TrendAction,
    /// The list the user settled on; `None` keeps the presented list
    pub selected: Option<Vec<Value>>,
}

impl TrendDecision {
    pub fn accept() -> Self {
        Self {
            action: TrendAction::Accept,
            selected: None,
        }
    }

    pub fn accept_only(selected: Vec<Value>) -> Self {
        Self {
            action: TrendAction::Accept,
            selected: Some(selected),
        }
    }

    pub fn other(action: TrendAction) -> Self {
        Self {
            action,
            selected: None,
        }
    }
}

/// Response to the suggestion list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuggestionAction {
    Apply,
    Skip,
    ManualEdit,
    Cancel,
}

impl SuggestionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apply => "apply",
            Self::Skip => "skip",
            Self::ManualEdit => "manual-edit",
            Self::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionDecision {
    pub action: SuggestionAction,
    pub manual_edit: Option<String>,
}

impl SuggestionDecision {
    pub fn new(action: SuggestionAction) -> Self {
        Self {
            action,
            manual_edit: None,
        }
    }

    pub fn manual_edit(text: impl Into<String>) -> Self {
        Self {
            action: SuggestionAction::ManualEdit,
            manual_edit: Some(text.into()),
        }
    }
}

/// Blocking human approval, injected into the pipeline
///
/// An `Err` means the gate itself broke (closed input, write failure) and is
/// treated as a step fault.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    async fn confirm_trends(
        &self,
        step: &StepSpec,
        trends: &[Value],
    ) -> anyhow::Result<TrendDecision>;

    async fn confirm_suggestions(
        &self,
        step: &StepSpec,
        suggestions: &[Value],
    ) -> anyhow::Result<SuggestionDecision>;

    /// Yes/no; a bare enter means yes
    async fn confirm(&self, message: &str) -> anyhow::Result<bool>;
}

/// What the pipeline does after a gate
#[derive(Debug, Clone, PartialEq)]
pub struct GateOutcome {
    pub proceed: bool,
    /// Action name for events and logs
    pub action: String,
    /// Fields merged into the input for the next step
    pub surfaced: Map<String, Value>,
}

impl GateOutcome {
    fn stop(action: &str) -> Self {
        Self {
            proceed: false,
            action: action.to_string(),
            surfaced: Map::new(),
        }
    }
}

/// Fallback yes/no prompt when the step has no message
pub fn default_message(step: &StepSpec) -> String {
    step.confirmation_message
        .clone()
        .unwrap_or_else(|| format!("Continue after '{}'?", step.label()))
}

fn list_field(result: &StepResult, key: &str) -> Vec<Value> {
    result
        .output
        .get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Run the gate variant the step asks for
pub async fn dispatch(
    gate: &dyn ConfirmationGate,
    step: &StepSpec,
    result: &StepResult,
) -> anyhow::Result<GateOutcome> {
    match step.confirmation_kind {
        ConfirmationKind::Trends => {
            let trends = list_field(result, "trends");
            let decision = gate.confirm_trends(step, &trends).await?;
            if decision.action != TrendAction::Accept {
                let action = serde_json::to_value(decision.action)?;
                return Ok(GateOutcome::stop(action.as_str().unwrap_or("declined")));
            }

            let mut surfaced = Map::new();
            surfaced.insert(
                "selectedTrends".to_string(),
                Value::Array(decision.selected.unwrap_or(trends)),
            );
            Ok(GateOutcome {
                proceed: true,
                action: "accept".to_string(),
                surfaced,
            })
        }
        ConfirmationKind::Suggestions => {
            let suggestions = list_field(result, "suggestions");
            let decision = gate.confirm_suggestions(step, &suggestions).await?;
            if decision.action == SuggestionAction::Cancel {
                return Ok(GateOutcome::stop(decision.action.as_str()));
            }

            let mut surfaced = Map::new();
            surfaced.insert(
                "suggestionAction".to_string(),
                Value::String(decision.action.as_str().to_string()),
            );
            if let Some(text) = decision.manual_edit.filter(|t| !t.trim().is_empty()) {
                surfaced.insert("manualEdit".to_string(), Value::String(text));
            }
            Ok(GateOutcome {
                proceed: true,
                action: decision.action.as_str().to_string(),
                surfaced,
            })
        }
        ConfirmationKind::Default => {
            if gate.confirm(&default_message(step)).await? {
                Ok(GateOutcome {
                    proceed: true,
                    action: "yes".to_string(),
                    surfaced: Map::new(),
                })
            } else {
                Ok(GateOutcome::stop("no"))
            }
        }
    }
}
