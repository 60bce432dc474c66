//! Status enums for workflow runs and their steps.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a workflow run.
///
/// A timed-out run is reported as Failed with a TIMEOUT error entry;
/// timeout is a failure cause, not a separate terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl RunStatus {
    /// Returns true if the run has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    /// Validates a transition from this status to another.
    ///
    /// Valid transitions:
    /// - Pending -> InProgress
    /// - InProgress -> Completed
    /// - InProgress -> Failed
    pub fn can_transition_to(&self, target: &RunStatus) -> bool {
        use RunStatus::*;
        matches!(
            (self, target),
            (Pending, InProgress) | (InProgress, Completed) | (InProgress, Failed)
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Pending => "Pending",
            RunStatus::InProgress => "InProgress",
            RunStatus::Completed => "Completed",
            RunStatus::Failed => "Failed",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle status of a single step within a workflow run.
///
/// Every run materializes a record for each canonical stage; stages the
/// plan leaves out go straight from Pending to Skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl StepStatus {
    /// Returns true if the step has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Completed | StepStatus::Failed | StepStatus::Skipped
        )
    }

    /// Validates a transition from this status to another.
    ///
    /// Valid transitions:
    /// - Pending -> InProgress
    /// - Pending -> Skipped
    /// - InProgress -> Completed
    /// - InProgress -> Failed
    pub fn can_transition_to(&self, target: &StepStatus) -> bool {
        use StepStatus::*;
        matches!(
            (self, target),
            (Pending, InProgress)
                | (Pending, Skipped)
                | (InProgress, Completed)
                | (InProgress, Failed)
        )
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepStatus::Pending => "Pending",
            StepStatus::InProgress => "InProgress",
            StepStatus::Completed => "Completed",
            StepStatus::Failed => "Failed",
            StepStatus::Skipped => "Skipped",
        };
        write!(f, "{}", s)
    }
}
