//! In-Memory Run Registry Adapter
//!
//! Keeps workflow run snapshots in a process-local map. The
//! orchestrator overwrites the entry on every checkpoint, so polling
//! readers always see the latest state.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::WorkflowId;
use crate::domain::workflow::WorkflowRun;
use crate::ports::{RunRegistry, RunRegistryError};

/// In-memory storage for workflow runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRunRegistry {
    runs: Arc<RwLock<HashMap<WorkflowId, WorkflowRun>>>,
}

impl InMemoryRunRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored runs (useful for tests).
    pub async fn clear(&self) {
        self.runs.write().await.clear();
    }

    /// Get the number of stored runs.
    pub async fn run_count(&self) -> usize {
        self.runs.read().await.len()
    }

    /// List the ids of stored runs (useful for tests).
    pub async fn workflow_ids(&self) -> Vec<WorkflowId> {
        self.runs.read().await.keys().copied().collect()
    }
}

#[async_trait]
impl RunRegistry for InMemoryRunRegistry {
    async fn save(&self, run: &WorkflowRun) -> Result<(), RunRegistryError> {
        let mut runs = self.runs.write().await;
        runs.insert(run.id(), run.clone());
        Ok(())
    }

    async fn get(&self, id: &WorkflowId) -> Result<WorkflowRun, RunRegistryError> {
        let runs = self.runs.read().await;
        runs.get(id).cloned().ok_or(RunRegistryError::NotFound(*id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{RecordId, RunStatus, Stage};
    use crate::domain::workflow::StagePlan;

    fn test_run() -> WorkflowRun {
        let record_id = RecordId::new("rec-123").unwrap();
        let plan = StagePlan::from_stages([Stage::FetchRecord, Stage::Preprocess]);
        WorkflowRun::new(record_id, plan)
    }

    #[tokio::test]
    async fn test_registry_save_and_get() {
        let registry = InMemoryRunRegistry::new();
        let run = test_run();

        registry.save(&run).await.unwrap();
        let loaded = registry.get(&run.id()).await.unwrap();

        assert_eq!(loaded, run);
    }

    #[tokio::test]
    async fn test_registry_get_nonexistent() {
        let registry = InMemoryRunRegistry::new();

        let result = registry.get(&WorkflowId::new()).await;

        assert!(matches!(result, Err(RunRegistryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_registry_save_overwrites_previous_snapshot() {
        let registry = InMemoryRunRegistry::new();
        let mut run = test_run();

        registry.save(&run).await.unwrap();
        run.start().unwrap();
        registry.save(&run).await.unwrap();

        let loaded = registry.get(&run.id()).await.unwrap();
        assert_eq!(loaded.status(), RunStatus::InProgress);
        assert_eq!(registry.run_count().await, 1);
    }

    #[tokio::test]
    async fn test_registry_holds_multiple_runs() {
        let registry = InMemoryRunRegistry::new();
        let run1 = test_run();
        let run2 = test_run();

        registry.save(&run1).await.unwrap();
        registry.save(&run2).await.unwrap();

        assert_eq!(registry.run_count().await, 2);
        assert_eq!(registry.get(&run1.id()).await.unwrap().id(), run1.id());
        assert_eq!(registry.get(&run2.id()).await.unwrap().id(), run2.id());
    }
}
