//! Stage plans computed by the router.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::Stage;

/// Ordered subset of pipeline stages chosen for one run.
///
/// Stages sit in canonical pipeline order regardless of insertion order,
/// and duplicate pushes collapse.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StagePlan {
    stages: Vec<Stage>,
}

impl StagePlan {
    /// Creates an empty plan.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Builds a plan from the given stages.
    pub fn from_stages(stages: impl IntoIterator<Item = Stage>) -> Self {
        let mut plan = Self::new();
        for stage in stages {
            plan.push(stage);
        }
        plan
    }

    /// Adds a stage, keeping canonical order and ignoring duplicates.
    pub fn push(&mut self, stage: Stage) {
        if self.stages.contains(&stage) {
            return;
        }
        let position = self
            .stages
            .iter()
            .position(|s| s.order_index() > stage.order_index())
            .unwrap_or(self.stages.len());
        self.stages.insert(position, stage);
    }

    /// Returns true if the stage is part of the plan.
    pub fn contains(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    /// Returns the planned stages in canonical order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Returns the number of planned stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if nothing is planned.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl fmt::Display for StagePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.stages.iter().map(|s| s.wire_name()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}
