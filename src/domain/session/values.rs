//! Session value objects.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::extraction::{MergedField, PreparedInput};
use crate::domain::foundation::{Stage, Timestamp, WorkflowId};
use crate::domain::routing::Intent;

/// One request/response pair in the session history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionTurn {
    pub user_message: String,
    pub response: String,
    pub intent: Intent,
    pub workflow_id: WorkflowId,
    pub occurred_at: Timestamp,
}

impl InteractionTurn {
    /// Creates a turn timestamped now.
    pub fn new(
        user_message: impl Into<String>,
        response: impl Into<String>,
        intent: Intent,
        workflow_id: WorkflowId,
    ) -> Self {
        Self {
            user_message: user_message.into(),
            response: response.into(),
            intent,
            workflow_id,
            occurred_at: Timestamp::now(),
        }
    }
}

/// Per-stage completion flags with timestamps, plus run counters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    pub stage_completions: HashMap<Stage, Timestamp>,
    pub total_runs: u32,
}

impl ProcessingMetadata {
    /// Returns true if the stage has completed in some prior run.
    pub fn is_completed(&self, stage: Stage) -> bool {
        self.stage_completions.contains_key(&stage)
    }

    /// Returns when the stage last completed.
    pub fn completed_at(&self, stage: Stage) -> Option<&Timestamp> {
        self.stage_completions.get(&stage)
    }

    /// Records a stage completion, refreshing the timestamp on re-runs.
    pub fn mark_completed(&mut self, stage: Stage) {
        self.stage_completions.insert(stage, Timestamp::now());
    }

    /// Returns completed stages in canonical pipeline order.
    pub fn completed_stages(&self) -> Vec<Stage> {
        let mut stages: Vec<Stage> = self.stage_completions.keys().copied().collect();
        stages.sort_by_key(|s| s.order_index());
        stages
    }

    /// Counts one more finished run.
    pub fn record_run(&mut self) {
        self.total_runs += 1;
    }
}

/// Changes the orchestrator folds into a session at the end of a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPatch {
    pub turn: InteractionTurn,
    pub input_snapshot: Option<PreparedInput>,
    pub last_response: Option<Vec<MergedField>>,
    pub completed_stages: Vec<Stage>,
}

impl SessionPatch {
    /// Creates a patch carrying only the interaction turn.
    pub fn new(turn: InteractionTurn) -> Self {
        Self {
            turn,
            input_snapshot: None,
            last_response: None,
            completed_stages: Vec::new(),
        }
    }

    /// Replaces the session's input snapshot.
    pub fn with_input_snapshot(mut self, input: PreparedInput) -> Self {
        self.input_snapshot = Some(input);
        self
    }

    /// Replaces the session's last merged response.
    pub fn with_last_response(mut self, merged: Vec<MergedField>) -> Self {
        self.last_response = Some(merged);
        self
    }

    /// Marks a stage completed by the patched-in run.
    pub fn with_completed_stage(mut self, stage: Stage) -> Self {
        if !self.completed_stages.contains(&stage) {
            self.completed_stages.push(stage);
        }
        self
    }
}
