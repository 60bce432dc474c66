//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).

pub mod gateway;
pub mod handlers;

pub use gateway::{CallFailure, CallGateway, CallResult, RetryPolicy};
pub use handlers::{
    // Workflow handlers
    GetTaskStatusHandler, GetTaskStatusQuery,
    GetWorkflowStatusHandler, GetWorkflowStatusQuery,
    RunWorkflowCommand, RunWorkflowHandler, WorkflowResult, WorkflowSettings,
    // Views
    QaAnswer, StepView, WorkflowStatusView,
};
