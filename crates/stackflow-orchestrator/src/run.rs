//! Run aggregate
//!
//! One `DeploymentRun` is owned by a single orchestrator invocation and
//! discarded after its outcome is reported. It is the only shared mutable
//! state of a run and is written exclusively by the scheduler loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stackflow_cloud::StackState;
use std::collections::BTreeMap;

/// Runtime record of one stack during a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackRun {
    pub name: String,
    pub state: StackState,

    /// Error detail, set when `state` is `Failed`
    pub last_error: Option<String>,

    /// Name of the failed or skipped dependency that caused this stack
    /// to be skipped (state stays `NotStarted`)
    pub skipped_due_to: Option<String>,

    /// Backend output values, populated once the stack settles
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

impl StackRun {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: StackState::NotStarted,
            last_error: None,
            skipped_due_to: None,
            outputs: BTreeMap::new(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped_due_to.is_some()
    }
}

/// Overall outcome of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    /// At least one stack failed; the rest of its branch was skipped,
    /// independent branches ran to completion
    PartialFailure { failed: Vec<String> },
    Aborted,
}

/// Aggregate result of one deployment or teardown invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRun {
    pub project: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Per-stack records, in execution order
    pub stacks: Vec<StackRun>,

    pub outcome: RunOutcome,

    /// Advisory findings: residual resources, cluster access problems,
    /// ignored hook errors. Never fatal.
    pub warnings: Vec<String>,
}

impl DeploymentRun {
    /// Start a run covering `order` (execution order)
    pub fn begin(project: impl Into<String>, order: &[String]) -> Self {
        Self {
            project: project.into(),
            started_at: Utc::now(),
            finished_at: None,
            stacks: order.iter().map(StackRun::new).collect(),
            outcome: RunOutcome::Success,
            warnings: Vec::new(),
        }
    }

    pub fn stack(&self, name: &str) -> Option<&StackRun> {
        self.stacks.iter().find(|s| s.name == name)
    }

    pub fn stack_mut(&mut self, name: &str) -> Option<&mut StackRun> {
        self.stacks.iter_mut().find(|s| s.name == name)
    }

    pub fn set_state(&mut self, name: &str, state: StackState) {
        if let Some(stack) = self.stack_mut(name) {
            stack.state = state;
        }
    }

    pub fn mark_failed(&mut self, name: &str, error: impl Into<String>) {
        if let Some(stack) = self.stack_mut(name) {
            stack.state = StackState::Failed;
            stack.last_error = Some(error.into());
        }
    }

    pub fn mark_skipped(&mut self, name: &str, due_to: impl Into<String>) {
        if let Some(stack) = self.stack_mut(name) {
            stack.state = StackState::NotStarted;
            stack.skipped_due_to = Some(due_to.into());
        }
    }

    pub fn failed_names(&self) -> Vec<String> {
        self.stacks
            .iter()
            .filter(|s| s.state == StackState::Failed)
            .map(|s| s.name.clone())
            .collect()
    }

    pub fn all_in_state(&self, state: StackState) -> bool {
        self.stacks.iter().all(|s| s.state == state)
    }

    /// Close the run: timestamp it and derive the outcome from per-stack
    /// states, unless it was already aborted.
    pub fn finish(&mut self, aborted: bool) {
        self.finished_at = Some(Utc::now());
        if aborted {
            self.outcome = RunOutcome::Aborted;
            return;
        }
        let failed = self.failed_names();
        self.outcome = if failed.is_empty() {
            RunOutcome::Success
        } else {
            RunOutcome::PartialFailure { failed }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_derives_outcome() {
        let order = vec!["vpc".to_string(), "cluster".to_string()];
        let mut run = DeploymentRun::begin("demo", &order);

        run.set_state("vpc", StackState::Settled);
        run.set_state("cluster", StackState::Settled);
        run.finish(false);
        assert_eq!(run.outcome, RunOutcome::Success);

        let mut run = DeploymentRun::begin("demo", &order);
        run.set_state("vpc", StackState::Settled);
        run.mark_failed("cluster", "boom");
        run.finish(false);
        assert_eq!(
            run.outcome,
            RunOutcome::PartialFailure {
                failed: vec!["cluster".to_string()]
            }
        );
    }

    #[test]
    fn test_finish_aborted_wins() {
        let order = vec!["vpc".to_string()];
        let mut run = DeploymentRun::begin("demo", &order);
        run.mark_failed("vpc", "boom");
        run.finish(true);
        assert_eq!(run.outcome, RunOutcome::Aborted);
    }

    #[test]
    fn test_skip_keeps_not_started() {
        let order = vec!["vpc".to_string(), "cluster".to_string()];
        let mut run = DeploymentRun::begin("demo", &order);
        run.mark_failed("vpc", "boom");
        run.mark_skipped("cluster", "vpc");

        let cluster = run.stack("cluster").unwrap();
        assert_eq!(cluster.state, StackState::NotStarted);
        assert!(cluster.is_skipped());
        assert_eq!(cluster.skipped_due_to.as_deref(), Some("vpc"));
    }
}
