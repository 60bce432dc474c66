//! Error types for workflow runs.

use thiserror::Error;

use crate::domain::foundation::{RunStatus, Stage, StepStatus};

/// Errors that can occur while driving a run's state machine.
#[derive(Debug, Clone, Error)]
pub enum RunError {
    #[error("Invalid run transition from {from} to {to}")]
    InvalidRunTransition { from: RunStatus, to: RunStatus },

    #[error("Invalid transition for step {stage} from {from} to {to}")]
    InvalidStepTransition {
        stage: Stage,
        from: StepStatus,
        to: StepStatus,
    },

    #[error("Run has no step for stage {0}")]
    UnknownStage(Stage),
}
