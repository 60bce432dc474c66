//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, enums, errors)
//! - `extraction` - Field specs, documents, page evidence and merging
//! - `routing` - Intent classification and stage planning
//! - `session` - Prefill session lifecycle across runs
//! - `workflow` - Run aggregate, step records and stage plans

pub mod extraction;
pub mod foundation;
pub mod routing;
pub mod session;
pub mod workflow;
