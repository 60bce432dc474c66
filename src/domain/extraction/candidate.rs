//! Per-page extraction candidates.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Score, ValidationError};

/// One page's proposed value for one field.
///
/// Produced by the completion service per page, consumed only by the
/// aggregator, never persisted beyond the run that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageCandidate {
    /// Label of the field this evidence targets.
    field_label: String,

    /// Global page index the evidence came from.
    page_index: u32,

    /// Raw extracted value, unvalidated.
    raw_value: String,

    /// Model confidence in the raw value.
    raw_confidence: Score,

    /// Quality of the page the value was read from.
    page_quality: Score,
}

impl PageCandidate {
    /// Creates a candidate.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if the field label is blank
    pub fn new(
        field_label: impl Into<String>,
        page_index: u32,
        raw_value: impl Into<String>,
        raw_confidence: Score,
        page_quality: Score,
    ) -> Result<Self, ValidationError> {
        let field_label = field_label.into();
        if field_label.trim().is_empty() {
            return Err(ValidationError::empty_field("field_label"));
        }
        Ok(Self {
            field_label,
            page_index,
            raw_value: raw_value.into(),
            raw_confidence,
            page_quality,
        })
    }

    /// Returns the targeted field label.
    pub fn field_label(&self) -> &str {
        &self.field_label
    }

    /// Returns the global page index.
    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    /// Returns the raw extracted value.
    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }

    /// Returns the model confidence.
    pub fn raw_confidence(&self) -> Score {
        self.raw_confidence
    }

    /// Returns the page quality.
    pub fn page_quality(&self) -> Score {
        self.page_quality
    }

    /// Returns the candidate's weight: confidence scaled by page quality.
    pub fn weight(&self) -> Score {
        self.raw_confidence.weighted_by(self.page_quality)
    }
}
