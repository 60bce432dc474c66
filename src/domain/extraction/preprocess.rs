//! Preprocessing of raw record input ahead of extraction.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{Document, DocumentSummary, FieldSpec};
use crate::domain::foundation::ValidationError;

/// Normalized input payload for one extraction pass.
///
/// This is the exact payload sent downstream and the snapshot persisted
/// on the session, so a continuation turn can replay extraction without
/// re-fetching the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedInput {
    field_specs: Vec<FieldSpec>,
    documents: Vec<Document>,
    document_summaries: Vec<DocumentSummary>,
}

impl PreparedInput {
    /// Returns the normalized field specs.
    pub fn field_specs(&self) -> &[FieldSpec] {
        &self.field_specs
    }

    /// Returns the source documents.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Returns the folded per-document metadata.
    pub fn document_summaries(&self) -> &[DocumentSummary] {
        &self.document_summaries
    }

    /// Returns the total page count across all documents.
    pub fn total_pages(&self) -> usize {
        self.documents.iter().map(Document::page_count).sum()
    }
}

/// Input normalization functions.
pub struct Preprocessor;

impl Preprocessor {
    /// Normalizes field specs and folds document metadata.
    ///
    /// # Algorithm
    /// 1. Reject duplicate field labels (the label is the identity key
    ///    evidence is matched against).
    /// 2. Force every spec's default value empty and clear any stale
    ///    target value.
    /// 3. Fold each document into its summary.
    ///
    /// # Edge Cases
    /// - Empty spec list: legal, produces an empty template downstream
    /// - Documents with zero pages: legal, contribute no evidence
    pub fn prepare(
        mut field_specs: Vec<FieldSpec>,
        documents: Vec<Document>,
    ) -> Result<PreparedInput, ValidationError> {
        let mut seen = HashSet::new();
        for spec in &field_specs {
            if !seen.insert(spec.label().to_string()) {
                return Err(ValidationError::invalid_format(
                    "field_specs",
                    format!("duplicate field label '{}'", spec.label()),
                ));
            }
        }

        for spec in &mut field_specs {
            spec.reset_for_extraction();
        }

        let document_summaries = documents.iter().map(Document::summary).collect();

        Ok(PreparedInput {
            field_specs,
            documents,
            document_summaries,
        })
    }
}
