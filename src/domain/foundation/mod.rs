//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, enums, and error types
//! that form the vocabulary of the prefill domain.

mod errors;
mod ids;
mod percentage;
mod run_status;
mod score;
mod session_status;
mod stage;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{RecordId, SessionId, TaskId, WorkflowId};
pub use percentage::Percentage;
pub use run_status::{RunStatus, StepStatus};
pub use score::Score;
pub use session_status::SessionStatus;
pub use stage::Stage;
pub use timestamp::Timestamp;
