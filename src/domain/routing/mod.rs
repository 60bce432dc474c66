//! Routing module - intent classification and stage planning.
//!
//! Maps free-form user messages onto the fixed extraction pipeline,
//! consulting prior session state to avoid redundant stages.

mod intent;
mod supervisor;

pub use intent::Intent;
pub use supervisor::{RoutingDecision, Supervisor};
