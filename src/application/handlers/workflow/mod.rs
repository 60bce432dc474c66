//! Workflow command and query handlers.

mod get_task_status;
mod get_workflow_status;
mod run_workflow;

pub use get_task_status::{GetTaskStatusHandler, GetTaskStatusQuery};
pub use get_workflow_status::{
    GetWorkflowStatusHandler, GetWorkflowStatusQuery, StepView, WorkflowStatusView,
};
pub use run_workflow::{
    QaAnswer, RunWorkflowCommand, RunWorkflowHandler, WorkflowResult, WorkflowSettings,
    MAX_USER_MESSAGE_LENGTH,
};
