//! Completion service port.
//!
//! Abstracts the extraction model that reads one document page and
//! proposes values for the requested form fields. The orchestrator
//! fans one request out per page and merges the returned candidates.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::extraction::{FieldSpec, PageCandidate};
use crate::domain::foundation::{RecordId, Score};
use crate::ports::Retryable;

/// One page's worth of extraction work.
#[derive(Debug, Clone)]
pub struct PageCompletionRequest {
    /// Record the page belongs to.
    pub record_id: RecordId,
    /// Global page index across the record's documents.
    pub page_index: u32,
    /// Raw page text.
    pub page_text: String,
    /// Scan quality of the page.
    pub page_quality: Score,
    /// Fields to propose values for.
    pub field_specs: Vec<FieldSpec>,
    /// Free-form question for QA turns; None for plain extraction.
    pub question: Option<String>,
}

impl PageCompletionRequest {
    /// Creates a request for one page.
    pub fn new(
        record_id: RecordId,
        page_index: u32,
        page_text: impl Into<String>,
        page_quality: Score,
    ) -> Self {
        Self {
            record_id,
            page_index,
            page_text: page_text.into(),
            page_quality,
            field_specs: Vec::new(),
            question: None,
        }
    }

    /// Sets the fields to extract.
    pub fn with_field_specs(mut self, specs: Vec<FieldSpec>) -> Self {
        self.field_specs = specs;
        self
    }

    /// Sets a QA question.
    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }
}

/// Port for the extraction completion model.
///
/// Implementations call an external model service and translate its
/// answers into page candidates. Confidence scores arrive raw; weighting
/// by page quality happens in the aggregator.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Propose candidate values for each requested field from one page.
    ///
    /// A field the page says nothing about simply has no candidate in
    /// the result; absence is not an error.
    async fn complete(
        &self,
        request: PageCompletionRequest,
    ) -> Result<Vec<PageCandidate>, CompletionError>;
}

/// Completion service errors.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Rate limited by the model service.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until retry is allowed.
        retry_after_secs: u32,
    },

    /// The model service is unavailable.
    #[error("completion service unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// Network error during the request.
    #[error("network error: {0}")]
    Network(String),

    /// The model response could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// The request itself was rejected.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The call exceeded its deadline.
    #[error("request timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout.
        timeout_secs: u64,
    },
}

impl CompletionError {
    /// Creates a rate limited error.
    pub fn rate_limited(retry_after_secs: u32) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}

impl Retryable for CompletionError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            CompletionError::RateLimited { .. }
                | CompletionError::Unavailable { .. }
                | CompletionError::Network(_)
                | CompletionError::Timeout { .. }
        )
    }
}
