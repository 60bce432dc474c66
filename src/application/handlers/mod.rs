//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod workflow;

pub use workflow::{
    // Handlers
    GetTaskStatusHandler,
    GetWorkflowStatusHandler,
    RunWorkflowHandler,
    // Commands and queries
    GetTaskStatusQuery,
    GetWorkflowStatusQuery,
    RunWorkflowCommand,
    // Results and views
    QaAnswer,
    StepView,
    WorkflowResult,
    WorkflowStatusView,
    // Settings
    WorkflowSettings,
    MAX_USER_MESSAGE_LENGTH,
};
