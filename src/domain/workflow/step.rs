//! StepRecord entity - execution trace of one pipeline stage.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Stage, StepStatus, Timestamp};
use crate::domain::workflow::errors::RunError;

/// Execution record for one canonical stage within a run.
///
/// Every run materializes a record per stage, in pipeline order.
/// Stages the plan leaves out are marked Skipped when the run starts.
/// Snapshots hold small JSON summaries of what went in and out, for
/// status reporting; they never hold full documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Which stage this record traces.
    name: Stage,

    /// Position in the canonical pipeline, starting at 0.
    order: u32,

    /// Current status.
    status: StepStatus,

    /// When execution began, if it did.
    started_at: Option<Timestamp>,

    /// When execution reached a terminal status, if it did.
    completed_at: Option<Timestamp>,

    /// Summary of the stage's input.
    input_snapshot: Option<serde_json::Value>,

    /// Summary of the stage's output.
    output_snapshot: Option<serde_json::Value>,

    /// Failure message, set only on Failed.
    error: Option<String>,
}

impl StepRecord {
    /// Creates a pending record for a stage.
    pub fn new(stage: Stage) -> Self {
        Self {
            name: stage,
            order: stage.order_index() as u32,
            status: StepStatus::Pending,
            started_at: None,
            completed_at: None,
            input_snapshot: None,
            output_snapshot: None,
            error: None,
        }
    }

    // Accessors

    pub fn name(&self) -> Stage {
        self.name
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    pub fn started_at(&self) -> Option<&Timestamp> {
        self.started_at.as_ref()
    }

    pub fn completed_at(&self) -> Option<&Timestamp> {
        self.completed_at.as_ref()
    }

    pub fn input_snapshot(&self) -> Option<&serde_json::Value> {
        self.input_snapshot.as_ref()
    }

    pub fn output_snapshot(&self) -> Option<&serde_json::Value> {
        self.output_snapshot.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    // Transitions

    /// Begins execution, recording the start time and input summary.
    pub fn start(&mut self, input_snapshot: Option<serde_json::Value>) -> Result<(), RunError> {
        self.transition_to(StepStatus::InProgress)?;
        self.started_at = Some(Timestamp::now());
        self.input_snapshot = input_snapshot;
        Ok(())
    }

    /// Finishes execution successfully, recording the output summary.
    pub fn complete(&mut self, output_snapshot: Option<serde_json::Value>) -> Result<(), RunError> {
        self.transition_to(StepStatus::Completed)?;
        self.completed_at = Some(Timestamp::now());
        self.output_snapshot = output_snapshot;
        Ok(())
    }

    /// Finishes execution with a failure message.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), RunError> {
        self.transition_to(StepStatus::Failed)?;
        self.completed_at = Some(Timestamp::now());
        self.error = Some(error.into());
        Ok(())
    }

    /// Marks the step skipped without ever running it.
    pub fn skip(&mut self) -> Result<(), RunError> {
        self.transition_to(StepStatus::Skipped)?;
        self.completed_at = Some(Timestamp::now());
        Ok(())
    }

    fn transition_to(&mut self, target: StepStatus) -> Result<(), RunError> {
        if !self.status.can_transition_to(&target) {
            return Err(RunError::InvalidStepTransition {
                stage: self.name,
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        Ok(())
    }
}
