//! # Scripted Gate
//!
//! Headless `ConfirmationGate`: answers from queued decisions, falling back to
//! a fixed default once a queue runs dry. Records everything it was shown.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::gate::{
    ConfirmationGate, SuggestionAction, SuggestionDecision, TrendAction, TrendDecision,
};
use crate::state::workflow::StepSpec;

#[derive(Debug, Default)]
struct Script {
    trends: VecDeque<TrendDecision>,
    suggestions: VecDeque<SuggestionDecision>,
    confirms: VecDeque<bool>,
    presented_trends: Vec<Vec<Value>>,
    presented_suggestions: Vec<Vec<Value>>,
    messages: Vec<String>,
}

#[derive(Debug)]
pub struct ScriptedGate {
    approve_by_default: bool,
    failure: Option<String>,
    script: Mutex<Script>,
    calls: AtomicUsize,
}

impl ScriptedGate {
    /// Accepts, applies and says yes unless told otherwise
    pub fn approving() -> Self {
        Self {
            approve_by_default: true,
            failure: None,
            script: Mutex::new(Script::default()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Cancels and says no unless told otherwise
    pub fn declining() -> Self {
        Self {
            approve_by_default: false,
            ..Self::approving()
        }
    }

    /// Every call errors with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::approving()
        }
    }

    pub fn then_trends(self, decision: TrendDecision) -> Self {
        self.lock().trends.push_back(decision);
        self
    }

    pub fn then_suggestions(self, decision: SuggestionDecision) -> Self {
        self.lock().suggestions.push_back(decision);
        self
    }

    pub fn then_confirm(self, answer: bool) -> Self {
        self.lock().confirms.push_back(answer);
        self
    }

    /// Number of gate invocations of any kind
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn presented_trends(&self) -> Vec<Vec<Value>> {
        self.lock().presented_trends.clone()
    }

    pub fn presented_suggestions(&self) -> Vec<Vec<Value>> {
        self.lock().presented_suggestions.clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.lock().messages.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enter(&self) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(anyhow::anyhow!("{}", message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ConfirmationGate for ScriptedGate {
    async fn confirm_trends(
        &self,
        _step: &StepSpec,
        trends: &[Value],
    ) -> anyhow::Result<TrendDecision> {
        self.enter()?;
        let mut script = self.lock();
        script.presented_trends.push(trends.to_vec());
        Ok(script.trends.pop_front().unwrap_or_else(|| {
            if self.approve_by_default {
                TrendDecision::accept()
            } else {
                TrendDecision::other(TrendAction::Cancel)
            }
        }))
    }

    async fn confirm_suggestions(
        &self,
        _step: &StepSpec,
        suggestions: &[Value],
    ) -> anyhow::Result<SuggestionDecision> {
        self.enter()?;
        let mut script = self.lock();
        script.presented_suggestions.push(suggestions.to_vec());
        Ok(script.suggestions.pop_front().unwrap_or_else(|| {
            SuggestionDecision::new(if self.approve_by_default {
                SuggestionAction::Apply
            } else {
                SuggestionAction::Cancel
            })
        }))
    }

    async fn confirm(&self, message: &str) -> anyhow::Result<bool> {
        self.enter()?;
        let mut script = self.lock();
        script.messages.push(message.to_string());
        Ok(script
            .confirms
            .pop_front()
            .unwrap_or(self.approve_by_default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_then_default() {
        let gate = ScriptedGate::approving().then_confirm(false);
        assert!(!gate.confirm("first").await.unwrap());
        assert!(gate.confirm("second").await.unwrap());
        assert_eq!(gate.calls(), 2);
    }

    #[tokio::test]
    async fn test_declining_defaults() {
        let gate = ScriptedGate::declining();
        let step = StepSpec::new("editor");
        assert!(!gate.confirm("go?").await.unwrap());
        assert_eq!(
            gate.confirm_trends(&step, &[]).await.unwrap().action,
            TrendAction::Cancel
        );
        assert_eq!(
            gate.confirm_suggestions(&step, &[]).await.unwrap().action,
            SuggestionAction::Cancel
        );
    }

    #[tokio::test]
    async fn test_failing_counts_calls() {
        let gate = ScriptedGate::failing("stdin closed");
        let err = gate.confirm("go?").await.unwrap_err();
        assert!(err.to_string().contains("stdin closed"));
        assert_eq!(gate.calls(), 1);
        assert!(gate.messages().is_empty());
    }
}
