//! Task monitor port.
//!
//! Poll-side contract for the call gateway's task registry. Every
//! outbound call the gateway drives gets a task entry; callers poll it
//! by ID to watch retries progress and read the terminal outcome.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::{TaskId, Timestamp};

/// Lifecycle status of a gateway task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    /// Submitted; attempts may still be running.
    Pending,
    /// An attempt succeeded.
    Succeeded,
    /// All attempts were exhausted or a permanent error occurred.
    Failed,
}

impl CallStatus {
    /// Returns true if the task has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallStatus::Succeeded | CallStatus::Failed)
    }
}

/// Point-in-time view of one gateway task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Task identifier handed out at submission.
    pub task_id: TaskId,
    /// What the call was for, e.g. `fetch_record` or `extract_page`.
    pub label: String,
    /// Current status.
    pub status: CallStatus,
    /// Attempts made so far.
    pub attempt_count: u32,
    /// Serialized success payload, present once Succeeded.
    pub result: Option<serde_json::Value>,
    /// Terminal error message, present once Failed.
    pub error: Option<String>,
    /// When the task was submitted.
    pub submitted_at: Timestamp,
}

/// Port for polling gateway task state.
#[async_trait]
pub trait TaskMonitor: Send + Sync {
    /// Returns the current snapshot of a submitted task.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no task with this ID was ever submitted
    async fn task_status(&self, task_id: &TaskId) -> Result<TaskSnapshot, TaskMonitorError>;
}

/// Task monitor errors.
#[derive(Debug, Error)]
pub enum TaskMonitorError {
    /// No task with this ID exists.
    #[error("task {0} not found")]
    NotFound(TaskId),
}
