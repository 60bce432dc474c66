//! Get task status query handler.
//!
//! Exposes the gateway's call registry, so callers can poll individual
//! upstream calls independently of the run that submitted them.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, TaskId};
use crate::ports::{TaskMonitor, TaskMonitorError, TaskSnapshot};

/// Query to get one gateway call's state.
#[derive(Debug, Clone)]
pub struct GetTaskStatusQuery {
    pub task_id: String,
}

/// Handler for the task status query.
pub struct GetTaskStatusHandler {
    task_monitor: Arc<dyn TaskMonitor>,
}

impl GetTaskStatusHandler {
    pub fn new(task_monitor: Arc<dyn TaskMonitor>) -> Self {
        Self { task_monitor }
    }

    /// Returns the call's current snapshot.
    ///
    /// # Errors
    ///
    /// - `TaskNotFound` if the ID is malformed or no such call exists
    pub async fn handle(&self, query: GetTaskStatusQuery) -> Result<TaskSnapshot, DomainError> {
        let task_id = query.task_id.parse::<TaskId>().map_err(|_| {
            DomainError::new(
                ErrorCode::TaskNotFound,
                format!("Task '{}' not found", query.task_id),
            )
        })?;

        self.task_monitor
            .task_status(&task_id)
            .await
            .map_err(|err| match err {
                TaskMonitorError::NotFound(id) => DomainError::new(
                    ErrorCode::TaskNotFound,
                    format!("Task '{}' not found", id),
                ),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;
    use crate::ports::CallStatus;
    use async_trait::async_trait;

    struct MockMonitor {
        snapshot: Option<TaskSnapshot>,
    }

    #[async_trait]
    impl TaskMonitor for MockMonitor {
        async fn task_status(&self, id: &TaskId) -> Result<TaskSnapshot, TaskMonitorError> {
            self.snapshot.clone().ok_or(TaskMonitorError::NotFound(*id))
        }
    }

    #[tokio::test]
    async fn returns_snapshot_for_known_task() {
        let task_id = TaskId::new();
        let snapshot = TaskSnapshot {
            task_id,
            label: "fetch_record".to_string(),
            status: CallStatus::Succeeded,
            attempt_count: 2,
            result: Some(serde_json::json!({"documents": 1})),
            error: None,
            submitted_at: Timestamp::now(),
        };
        let handler = GetTaskStatusHandler::new(Arc::new(MockMonitor {
            snapshot: Some(snapshot),
        }));

        let view = handler
            .handle(GetTaskStatusQuery {
                task_id: task_id.to_string(),
            })
            .await
            .unwrap();

        assert_eq!(view.task_id, task_id);
        assert_eq!(view.status, CallStatus::Succeeded);
        assert_eq!(view.attempt_count, 2);
    }

    #[tokio::test]
    async fn unknown_task_reads_not_found() {
        let handler = GetTaskStatusHandler::new(Arc::new(MockMonitor { snapshot: None }));

        let err = handler
            .handle(GetTaskStatusQuery {
                task_id: TaskId::new().to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::TaskNotFound);
    }

    #[tokio::test]
    async fn malformed_id_reads_not_found() {
        let handler = GetTaskStatusHandler::new(Arc::new(MockMonitor { snapshot: None }));

        let err = handler
            .handle(GetTaskStatusQuery {
                task_id: "not-a-uuid".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::TaskNotFound);
    }
}
