//! # Execution Context
//!
//! The input threaded through a run. Keeps every step's output as it was
//! produced, plus the merged view agents read from. Merging is shallow and the
//! last writer wins; every overwrite is recorded as a `KeyCollision`.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::skills::{ExecutionInput, StepResult};
use crate::state::workflow::StepSpec;

/// Writer name used for keys that came from the seed input
pub const SEED_WRITER: &str = "seed";

/// Output contributed by one writer, in the order it was absorbed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutput {
    pub writer: String,
    pub output: Map<String, Value>,
}

/// A key written by one writer and overwritten by a later one
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyCollision {
    pub key: String,
    pub previous: String,
    pub overwritten_by: String,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    seed: ExecutionInput,
    outputs: Vec<StepOutput>,
    merged: ExecutionInput,
    owners: HashMap<String, String>,
    collisions: Vec<KeyCollision>,
}

impl ExecutionContext {
    pub fn new(seed: ExecutionInput) -> Self {
        let owners = seed
            .keys()
            .map(|k| (k.clone(), SEED_WRITER.to_string()))
            .collect();
        Self {
            merged: seed.clone(),
            seed,
            outputs: Vec::new(),
            owners,
            collisions: Vec::new(),
        }
    }

    /// Rebuild from a checkpoint: seed, then each recorded output followed by
    /// whatever its gate surfaced
    pub fn rebuild(
        seed: ExecutionInput,
        results: &IndexMap<String, StepResult>,
        gate_inputs: &IndexMap<String, Map<String, Value>>,
    ) -> Self {
        let mut context = Self::new(seed);
        for (step_id, result) in results {
            context.absorb(step_id, &result.output);
            if let Some(surfaced) = gate_inputs.get(step_id) {
                context.absorb(&gate_writer(step_id), surfaced);
            }
        }
        context
    }

    /// Shallow-merge `output` into the input. Returns the collisions it caused.
    pub fn absorb(&mut self, writer: &str, output: &Map<String, Value>) -> Vec<KeyCollision> {
        let mut caused = Vec::new();
        for (key, value) in output {
            if self.merged.contains_key(key) {
                if let Some(previous) = self.owners.get(key) {
                    caused.push(KeyCollision {
                        key: key.clone(),
                        previous: previous.clone(),
                        overwritten_by: writer.to_string(),
                    });
                }
            }
            self.merged.insert(key.clone(), value.clone());
            self.owners.insert(key.clone(), writer.to_string());
        }

        self.outputs.push(StepOutput {
            writer: writer.to_string(),
            output: output.clone(),
        });
        self.collisions.extend(caused.iter().cloned());
        caused
    }

    /// The input a step sees: everything, or only its declared `reads`
    pub fn view_for(&self, step: &StepSpec) -> ExecutionInput {
        if step.reads.is_empty() {
            return self.merged.clone();
        }
        step.reads
            .iter()
            .filter_map(|key| self.merged.get(key).map(|v| (key.clone(), v.clone())))
            .collect()
    }

    pub fn merged(&self) -> &ExecutionInput {
        &self.merged
    }

    pub fn seed(&self) -> &ExecutionInput {
        &self.seed
    }

    pub fn outputs(&self) -> &[StepOutput] {
        &self.outputs
    }

    pub fn collisions(&self) -> &[KeyCollision] {
        &self.collisions
    }

    /// Writer that last set `key`
    pub fn owner_of(&self, key: &str) -> Option<&str> {
        self.owners.get(key).map(String::as_str)
    }
}

/// Writer name for fields a step's confirmation gate surfaced
pub fn gate_writer(step_id: &str) -> String {
    format!("{}:gate", step_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_last_writer_wins_and_collision_is_recorded() {
        let mut context = ExecutionContext::new(map(json!({"topic": "taxes"})));

        assert!(context.absorb("a", &map(json!({"k": 1}))).is_empty());
        let caused = context.absorb("b", &map(json!({"k": 2, "extra": true})));

        assert_eq!(context.merged()["k"], json!(2));
        assert_eq!(context.owner_of("k"), Some("b"));
        assert_eq!(
            caused,
            vec![KeyCollision {
                key: "k".to_string(),
                previous: "a".to_string(),
                overwritten_by: "b".to_string(),
            }]
        );
        assert_eq!(context.outputs().len(), 2);
        assert_eq!(context.outputs()[0].output["k"], json!(1));
    }

    #[test]
    fn test_seed_overwrite_is_a_collision() {
        let mut context = ExecutionContext::new(map(json!({"topic": "taxes"})));
        let caused = context.absorb("draft", &map(json!({"topic": "parking"})));
        assert_eq!(caused[0].previous, SEED_WRITER);
        assert_eq!(context.seed()["topic"], json!("taxes"));
    }

    #[test]
    fn test_reads_filter_view() {
        let context = ExecutionContext::new(map(json!({"a": 1, "b": 2, "c": 3})));
        let step = StepSpec::new("editor").with_reads(["a", "c", "missing"]);

        let view = context.view_for(&step);
        assert_eq!(view.len(), 2);
        assert!(view.contains_key("a") && view.contains_key("c"));

        let all = context.view_for(&StepSpec::new("editor"));
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_rebuild_replays_outputs_and_gate_fields() {
        let mut results = IndexMap::new();
        results.insert(
            "research".to_string(),
            StepResult::completed("ok", map(json!({"trends": ["x"]}))),
        );
        results.insert(
            "draft".to_string(),
            StepResult::completed("ok", map(json!({"content": "body"}))),
        );
        let mut gate_inputs = IndexMap::new();
        gate_inputs.insert(
            "research".to_string(),
            map(json!({"selectedTrends": ["x"]})),
        );

        let context = ExecutionContext::rebuild(map(json!({"topic": "t"})), &results, &gate_inputs);

        assert_eq!(context.merged()["topic"], json!("t"));
        assert_eq!(context.merged()["selectedTrends"], json!(["x"]));
        assert_eq!(context.merged()["content"], json!("body"));
        assert_eq!(context.owner_of("selectedTrends"), Some("research:gate"));
        assert_eq!(context.outputs().len(), 3);
    }
}
