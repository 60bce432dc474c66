//! Workflow module - run aggregate and stage planning.
//!
//! A workflow run is one pass through the extraction pipeline. The
//! module owns the plan (which stages execute), the step records
//! (what actually happened), and the run state machine tying them
//! together.

mod errors;
mod plan;
mod run;
mod step;

pub use errors::RunError;
pub use plan::StagePlan;
pub use run::{RunErrorEntry, WorkflowRun};
pub use step::StepRecord;
