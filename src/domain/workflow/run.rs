//! WorkflowRun aggregate - the root entity for pipeline executions.
//!
//! A run owns the step records for one pass through the extraction
//! pipeline and manages their lifecycle from planning to terminal
//! status.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    ErrorCode, Percentage, RecordId, RunStatus, SessionId, Stage, StepStatus, Timestamp,
    WorkflowId,
};
use crate::domain::workflow::errors::RunError;
use crate::domain::workflow::plan::StagePlan;
use crate::domain::workflow::step::StepRecord;

/// One recorded failure within a run.
///
/// `error_type` carries the stable wire code (for example `TIMEOUT`);
/// `step` is absent for failures outside any stage, such as persistence
/// at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunErrorEntry {
    pub step: Option<Stage>,
    pub error: String,
    pub error_type: String,
}

/// The WorkflowRun aggregate root.
///
/// # Invariants
///
/// - `steps` always holds one record per canonical stage, in pipeline
///   order, regardless of what the plan contains
/// - Stages outside the plan are Skipped the moment the run starts
/// - A failed step moves the run to Failed; later planned steps are
///   left Pending, never started
/// - `completed_at` is set exactly when the run reaches a terminal
///   status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    id: WorkflowId,
    session_id: Option<SessionId>,
    record_id: RecordId,
    status: RunStatus,
    plan: StagePlan,
    steps: Vec<StepRecord>,
    errors: Vec<RunErrorEntry>,
    started_at: Timestamp,
    completed_at: Option<Timestamp>,
}

impl WorkflowRun {
    /// Creates a pending run for a record with the given plan.
    pub fn new(record_id: RecordId, plan: StagePlan) -> Self {
        let steps = Stage::all().iter().map(|s| StepRecord::new(*s)).collect();
        Self {
            id: WorkflowId::new(),
            session_id: None,
            record_id,
            status: RunStatus::Pending,
            plan,
            steps,
            errors: Vec::new(),
            started_at: Timestamp::now(),
            completed_at: None,
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Accessors
    // ───────────────────────────────────────────────────────────────

    /// Returns the run ID.
    pub fn id(&self) -> WorkflowId {
        self.id
    }

    /// Returns the session this run belongs to, once attached.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    /// Returns the record the run operates on.
    pub fn record_id(&self) -> &RecordId {
        &self.record_id
    }

    /// Returns the run status.
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Returns the planned stages.
    pub fn plan(&self) -> &StagePlan {
        &self.plan
    }

    /// Returns all step records in pipeline order.
    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    /// Returns the step record for a stage.
    pub fn step(&self, stage: Stage) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.name() == stage)
    }

    /// Returns the recorded failures, oldest first.
    pub fn errors(&self) -> &[RunErrorEntry] {
        &self.errors
    }

    /// Returns when the run was created.
    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Returns when the run reached a terminal status.
    pub fn completed_at(&self) -> Option<Timestamp> {
        self.completed_at
    }

    /// Returns true if the run has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns completion across planned stages as a percentage.
    ///
    /// Only planned stages count; skipped stages are neither progress
    /// nor debt. An empty plan reads 100 once the run completes and 0
    /// before that.
    pub fn progress_percentage(&self) -> Percentage {
        let total = self.plan.len();
        if total == 0 {
            return match self.status {
                RunStatus::Completed => Percentage::HUNDRED,
                _ => Percentage::ZERO,
            };
        }
        let completed = self
            .steps
            .iter()
            .filter(|s| self.plan.contains(s.name()) && s.status() == StepStatus::Completed)
            .count();
        Percentage::from_ratio(completed, total)
    }

    // ───────────────────────────────────────────────────────────────
    // Transitions
    // ───────────────────────────────────────────────────────────────

    /// Links the run to the session it was (or will be) recorded on.
    pub fn attach_session(&mut self, session_id: SessionId) {
        self.session_id = Some(session_id);
    }

    /// Begins execution, skipping every stage the plan leaves out.
    pub fn start(&mut self) -> Result<(), RunError> {
        self.transition_to(RunStatus::InProgress)?;
        for step in &mut self.steps {
            if !self.plan.contains(step.name()) {
                step.skip()?;
            }
        }
        Ok(())
    }

    /// Begins execution of a planned stage.
    pub fn start_step(
        &mut self,
        stage: Stage,
        input_snapshot: Option<serde_json::Value>,
    ) -> Result<(), RunError> {
        self.step_mut(stage)?.start(input_snapshot)
    }

    /// Completes a stage with its output summary.
    pub fn complete_step(
        &mut self,
        stage: Stage,
        output_snapshot: Option<serde_json::Value>,
    ) -> Result<(), RunError> {
        self.step_mut(stage)?.complete(output_snapshot)
    }

    /// Fails a stage and, with it, the whole run.
    ///
    /// Later planned stages are left Pending; they never start.
    pub fn fail_step(
        &mut self,
        stage: Stage,
        error_type: ErrorCode,
        message: impl Into<String>,
    ) -> Result<(), RunError> {
        let message = message.into();
        self.step_mut(stage)?.fail(message.clone())?;
        self.errors.push(RunErrorEntry {
            step: Some(stage),
            error: message,
            error_type: error_type.to_string(),
        });
        self.transition_to(RunStatus::Failed)?;
        self.completed_at = Some(Timestamp::now());
        Ok(())
    }

    /// Fails the run outside any stage.
    pub fn fail(
        &mut self,
        error_type: ErrorCode,
        message: impl Into<String>,
    ) -> Result<(), RunError> {
        self.errors.push(RunErrorEntry {
            step: None,
            error: message.into(),
            error_type: error_type.to_string(),
        });
        self.transition_to(RunStatus::Failed)?;
        self.completed_at = Some(Timestamp::now());
        Ok(())
    }

    /// Completes the run after every planned stage finished.
    pub fn complete(&mut self) -> Result<(), RunError> {
        self.transition_to(RunStatus::Completed)?;
        self.completed_at = Some(Timestamp::now());
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────
    // Private helpers
    // ───────────────────────────────────────────────────────────────

    fn step_mut(&mut self, stage: Stage) -> Result<&mut StepRecord, RunError> {
        self.steps
            .iter_mut()
            .find(|s| s.name() == stage)
            .ok_or(RunError::UnknownStage(stage))
    }

    fn transition_to(&mut self, target: RunStatus) -> Result<(), RunError> {
        if !self.status.can_transition_to(&target) {
            return Err(RunError::InvalidRunTransition {
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        Ok(())
    }
}
