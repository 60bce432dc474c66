//! Mock Completion Service for testing.
//!
//! Configurable implementation of the CompletionService port so tests
//! and local development can run without a real extraction model.
//!
//! # Features
//!
//! - Queued responses consumed in order
//! - Deterministic synthesized candidates once the queue is empty
//! - Error injection for resilience testing
//! - Call tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let service = MockCompletionService::new()
//!     .with_candidates(vec![candidate])
//!     .with_delay(Duration::from_millis(100));
//!
//! let candidates = service.complete(request).await?;
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::extraction::PageCandidate;
use crate::domain::foundation::Score;
use crate::ports::{CompletionError, CompletionService, PageCompletionRequest};

/// Mock completion service for testing.
///
/// Returns queued responses in order; once the queue is exhausted it
/// synthesizes one candidate per requested field so pipeline tests can
/// run without scripting every page.
#[derive(Debug, Clone, Default)]
pub struct MockCompletionService {
    /// Pre-configured responses (consumed in order).
    responses: Arc<Mutex<VecDeque<MockCompletion>>>,
    /// Simulated latency per request.
    delay: Duration,
    /// Call history for verification.
    calls: Arc<Mutex<Vec<PageCompletionRequest>>>,
}

/// A configured mock response.
#[derive(Debug, Clone)]
pub enum MockCompletion {
    /// Return these candidates.
    Candidates(Vec<PageCandidate>),
    /// Return an error.
    Error(MockCompletionError),
}

/// Mock error types for testing error handling.
#[derive(Debug, Clone)]
pub enum MockCompletionError {
    /// Simulate rate limiting.
    RateLimited { retry_after_secs: u32 },
    /// Simulate service unavailable.
    Unavailable { message: String },
    /// Simulate network error.
    Network { message: String },
    /// Simulate an undecodable model response.
    Parse { message: String },
    /// Simulate timeout.
    Timeout { timeout_secs: u64 },
}

impl From<MockCompletionError> for CompletionError {
    fn from(err: MockCompletionError) -> Self {
        match err {
            MockCompletionError::RateLimited { retry_after_secs } => {
                CompletionError::rate_limited(retry_after_secs)
            }
            MockCompletionError::Unavailable { message } => CompletionError::unavailable(message),
            MockCompletionError::Network { message } => CompletionError::network(message),
            MockCompletionError::Parse { message } => CompletionError::parse(message),
            MockCompletionError::Timeout { timeout_secs } => {
                CompletionError::Timeout { timeout_secs }
            }
        }
    }
}

impl MockCompletionService {
    /// Creates a new mock service with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a candidate response to the queue.
    pub fn with_candidates(self, candidates: Vec<PageCandidate>) -> Self {
        let mut responses = self.responses.lock().unwrap();
        responses.push_back(MockCompletion::Candidates(candidates));
        drop(responses);
        self
    }

    /// Adds an error response to the queue.
    pub fn with_error(self, error: MockCompletionError) -> Self {
        let mut responses = self.responses.lock().unwrap();
        responses.push_back(MockCompletion::Error(error));
        drop(responses);
        self
    }

    /// Sets simulated latency per request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns the number of calls made to this service.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Returns all recorded calls.
    pub fn get_calls(&self) -> Vec<PageCompletionRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Clears the call history.
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Gets the next queued response, if any.
    fn next_response(&self) -> Option<MockCompletion> {
        self.responses.lock().unwrap().pop_front()
    }

    /// Fabricates one candidate per requested field.
    ///
    /// Constrained fields answer with their first allowed value so the
    /// prefill stage accepts the result; free-text fields echo the
    /// label and page.
    fn synthesize(request: &PageCompletionRequest) -> Vec<PageCandidate> {
        request
            .field_specs
            .iter()
            .filter_map(|spec| {
                let value = match spec.kind().allowed_values() {
                    Some(allowed) => allowed.first().cloned()?,
                    None => format!("{} page {}", spec.label(), request.page_index),
                };
                PageCandidate::new(
                    spec.label(),
                    request.page_index,
                    value,
                    Score::clamped(0.8),
                    request.page_quality,
                )
                .ok()
            })
            .collect()
    }
}

#[async_trait]
impl CompletionService for MockCompletionService {
    async fn complete(
        &self,
        request: PageCompletionRequest,
    ) -> Result<Vec<PageCandidate>, CompletionError> {
        // Record the call
        self.calls.lock().unwrap().push(request.clone());

        // Simulate delay
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        match self.next_response() {
            Some(MockCompletion::Candidates(candidates)) => Ok(candidates),
            Some(MockCompletion::Error(err)) => Err(err.into()),
            None => Ok(Self::synthesize(&request)),
        }
    }
}
