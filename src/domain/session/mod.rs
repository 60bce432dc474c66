//! Session domain module.
//!
//! Handles prefill session lifecycle including creation, patching after
//! runs, and expiry. A session remembers what earlier runs on the same
//! record already produced, so follow-up requests skip the stages whose
//! outputs are still valid.

mod aggregate;
mod values;

pub use aggregate::Session;
pub use values::{InteractionTurn, ProcessingMetadata, SessionPatch};
