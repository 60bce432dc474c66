//! Completion Service Adapters.
//!
//! Implementations of the CompletionService port for the extraction
//! model.
//!
//! ## Available Adapters
//!
//! - `MockCompletionService` - Configurable mock for testing
//! - `HttpCompletionService` - Extraction model service over HTTP

mod http_completion_service;
mod mock_completion_service;

pub use http_completion_service::{CompletionApiConfig, HttpCompletionService};
pub use mock_completion_service::{MockCompletion, MockCompletionError, MockCompletionService};
