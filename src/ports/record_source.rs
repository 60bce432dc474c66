//! Record source port.
//!
//! Abstracts the system of record that holds scanned documents and the
//! form template for each business record. The orchestrator fetches a
//! record once per fresh run; continuations replay the stored snapshot.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::extraction::{Document, FieldSpec};
use crate::domain::foundation::RecordId;
use crate::ports::Retryable;

/// Everything the pipeline needs for one record: the documents to read
/// and the form fields to fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordBundle {
    pub documents: Vec<Document>,
    pub field_specs: Vec<FieldSpec>,
}

impl RecordBundle {
    /// Creates a bundle from fetched parts.
    pub fn new(documents: Vec<Document>, field_specs: Vec<FieldSpec>) -> Self {
        Self {
            documents,
            field_specs,
        }
    }

    /// Total page count across all documents.
    pub fn total_pages(&self) -> usize {
        self.documents.iter().map(|d| d.page_count()).sum()
    }
}

/// Port for fetching record payloads from the system of record.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch the documents and form template for a record.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the record does not exist upstream
    /// - `Unavailable`, `Timeout`, `RateLimited` on transient upstream trouble
    /// - `Malformed` if the upstream payload cannot be decoded
    async fn fetch_record(&self, record_id: &RecordId) -> Result<RecordBundle, RecordSourceError>;
}

/// Record source errors.
#[derive(Debug, Error)]
pub enum RecordSourceError {
    /// The record does not exist upstream.
    #[error("record {0} not found")]
    NotFound(String),

    /// The upstream system is down or refusing connections.
    #[error("record source unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// The upstream call exceeded its deadline.
    #[error("record source timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout.
        timeout_secs: u64,
    },

    /// Rate limited by the upstream system.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until retry is allowed.
        retry_after_secs: u32,
    },

    /// The upstream payload could not be decoded.
    #[error("malformed record payload: {0}")]
    Malformed(String),
}

impl RecordSourceError {
    /// Creates a not found error.
    pub fn not_found(record_id: impl Into<String>) -> Self {
        Self::NotFound(record_id.into())
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a malformed payload error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

impl Retryable for RecordSourceError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            RecordSourceError::Unavailable { .. }
                | RecordSourceError::Timeout { .. }
                | RecordSourceError::RateLimited { .. }
        )
    }
}
