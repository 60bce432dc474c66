//! Run registry port.
//!
//! Stores workflow run snapshots for status polling. The orchestrator
//! saves after every transition, so readers always see the latest
//! progress.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{ErrorCode, WorkflowId};
use crate::domain::workflow::WorkflowRun;

/// Registry port for workflow run persistence.
#[async_trait]
pub trait RunRegistry: Send + Sync {
    /// Persist the run's current state, replacing any earlier snapshot.
    ///
    /// # Errors
    ///
    /// - `Storage` on persistence failure
    async fn save(&self, run: &WorkflowRun) -> Result<(), RunRegistryError>;

    /// Load a run by workflow ID.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no run with this ID was ever saved
    /// - `Storage` on persistence failure
    async fn get(&self, id: &WorkflowId) -> Result<WorkflowRun, RunRegistryError>;
}

/// Run registry errors.
#[derive(Debug, Error)]
pub enum RunRegistryError {
    /// No run with this workflow ID exists.
    #[error("workflow run {0} not found")]
    NotFound(WorkflowId),

    /// Underlying storage failed.
    #[error("run storage failed: {0}")]
    Storage(String),
}

impl RunRegistryError {
    /// Maps the error onto its stable wire code.
    pub fn code(&self) -> ErrorCode {
        match self {
            RunRegistryError::NotFound(_) => ErrorCode::TaskNotFound,
            RunRegistryError::Storage(_) => ErrorCode::StorageError,
        }
    }
}
