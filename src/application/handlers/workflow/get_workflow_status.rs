//! Get workflow status query handler.
//!
//! Reads the run registry, so the view reflects the orchestrator's
//! latest checkpoint even while the run is still executing.

use serde::Serialize;
use std::sync::Arc;

use crate::domain::foundation::{
    DomainError, ErrorCode, Percentage, RecordId, RunStatus, SessionId, Stage, StepStatus,
    Timestamp, WorkflowId,
};
use crate::domain::workflow::{RunErrorEntry, StepRecord, WorkflowRun};
use crate::ports::{RunRegistry, RunRegistryError};

/// Query to get a workflow run's current state.
#[derive(Debug, Clone)]
pub struct GetWorkflowStatusQuery {
    pub workflow_id: String,
}

/// One step of the run, as exposed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub name: Stage,
    pub status: StepStatus,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub error: Option<String>,
}

impl From<&StepRecord> for StepView {
    fn from(step: &StepRecord) -> Self {
        Self {
            name: step.name(),
            status: step.status(),
            started_at: step.started_at().copied(),
            completed_at: step.completed_at().copied(),
            error: step.error().map(str::to_string),
        }
    }
}

/// Caller-facing snapshot of a workflow run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowStatusView {
    pub workflow_id: WorkflowId,
    pub session_id: Option<SessionId>,
    pub record_id: RecordId,
    pub status: RunStatus,
    pub progress: Percentage,
    pub steps: Vec<StepView>,
    pub errors: Vec<RunErrorEntry>,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl From<&WorkflowRun> for WorkflowStatusView {
    fn from(run: &WorkflowRun) -> Self {
        Self {
            workflow_id: run.id(),
            session_id: run.session_id(),
            record_id: run.record_id().clone(),
            status: run.status(),
            progress: run.progress_percentage(),
            steps: run.steps().iter().map(StepView::from).collect(),
            errors: run.errors().to_vec(),
            started_at: run.started_at(),
            completed_at: run.completed_at(),
        }
    }
}

/// Handler for the workflow status query.
pub struct GetWorkflowStatusHandler {
    run_registry: Arc<dyn RunRegistry>,
}

impl GetWorkflowStatusHandler {
    pub fn new(run_registry: Arc<dyn RunRegistry>) -> Self {
        Self { run_registry }
    }

    /// Returns the run's latest checkpointed state.
    ///
    /// # Errors
    ///
    /// - `TaskNotFound` if the ID is malformed or no such run exists
    /// - `StorageError` if the registry cannot be read
    pub async fn handle(
        &self,
        query: GetWorkflowStatusQuery,
    ) -> Result<WorkflowStatusView, DomainError> {
        let workflow_id = query.workflow_id.parse::<WorkflowId>().map_err(|_| {
            DomainError::new(
                ErrorCode::TaskNotFound,
                format!("Workflow run '{}' not found", query.workflow_id),
            )
        })?;

        let run = self.run_registry.get(&workflow_id).await.map_err(|err| match err {
            RunRegistryError::NotFound(id) => DomainError::new(
                ErrorCode::TaskNotFound,
                format!("Workflow run '{}' not found", id),
            ),
            RunRegistryError::Storage(message) => {
                DomainError::new(ErrorCode::StorageError, message)
            }
        })?;

        Ok(WorkflowStatusView::from(&run))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::StagePlan;
    use async_trait::async_trait;

    struct MockRegistry {
        run: Option<WorkflowRun>,
    }

    #[async_trait]
    impl RunRegistry for MockRegistry {
        async fn save(&self, _run: &WorkflowRun) -> Result<(), RunRegistryError> {
            Ok(())
        }

        async fn get(&self, id: &WorkflowId) -> Result<WorkflowRun, RunRegistryError> {
            self.run.clone().ok_or(RunRegistryError::NotFound(*id))
        }
    }

    fn in_progress_run() -> WorkflowRun {
        let record_id = RecordId::new("rec-1").unwrap();
        let plan = StagePlan::from_stages([Stage::FetchRecord, Stage::Preprocess, Stage::Extract]);
        let mut run = WorkflowRun::new(record_id, plan);
        run.start().unwrap();
        run.start_step(Stage::FetchRecord, None).unwrap();
        run.complete_step(Stage::FetchRecord, None).unwrap();
        run
    }

    #[tokio::test]
    async fn returns_view_with_per_step_statuses() {
        let run = in_progress_run();
        let workflow_id = run.id();
        let handler = GetWorkflowStatusHandler::new(Arc::new(MockRegistry { run: Some(run) }));

        let view = handler
            .handle(GetWorkflowStatusQuery {
                workflow_id: workflow_id.to_string(),
            })
            .await
            .unwrap();

        assert_eq!(view.workflow_id, workflow_id);
        assert_eq!(view.status, RunStatus::InProgress);
        assert_eq!(view.steps.len(), 5);
        assert_eq!(view.steps[0].status, StepStatus::Completed);
        assert_eq!(view.steps[1].status, StepStatus::Pending);
        assert_eq!(view.steps[3].status, StepStatus::Skipped);
        assert_eq!(view.progress.value(), 33);
        assert!(view.completed_at.is_none());
    }

    #[tokio::test]
    async fn unknown_run_reads_task_not_found() {
        let handler = GetWorkflowStatusHandler::new(Arc::new(MockRegistry { run: None }));

        let err = handler
            .handle(GetWorkflowStatusQuery {
                workflow_id: WorkflowId::new().to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::TaskNotFound);
    }

    #[tokio::test]
    async fn malformed_id_reads_task_not_found() {
        let handler = GetWorkflowStatusHandler::new(Arc::new(MockRegistry { run: None }));

        let err = handler
            .handle(GetWorkflowStatusQuery {
                workflow_id: "not-a-uuid".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::TaskNotFound);
    }
}
