//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `SessionStore` - Session aggregate persistence with TTL semantics
//! - `RunRegistry` - Workflow run snapshots for status polling
//!
//! ## Upstream Ports
//!
//! - `RecordSource` - Documents and form template for a record
//! - `CompletionService` - Per-page field extraction model
//!
//! ## Gateway Ports
//!
//! - `TaskMonitor` - Poll-side view of the call gateway's task registry
//! - `Retryable` - Retry classification implemented by upstream errors

mod completion_service;
mod record_source;
mod retryable;
mod run_registry;
mod session_store;
mod task_monitor;

pub use completion_service::{CompletionError, CompletionService, PageCompletionRequest};
pub use record_source::{RecordBundle, RecordSource, RecordSourceError};
pub use retryable::Retryable;
pub use run_registry::{RunRegistry, RunRegistryError};
pub use session_store::{SessionStore, SessionStoreError};
pub use task_monitor::{CallStatus, TaskMonitor, TaskMonitorError, TaskSnapshot};
