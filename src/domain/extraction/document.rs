//! Source documents and their pages.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Score, ValidationError};

/// One page of a source document, as produced by the upstream text
/// extraction engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPage {
    /// Zero-based position within the owning document.
    page_number: u32,

    /// Extracted text content.
    text: String,

    /// Upstream quality score for this page's extraction.
    quality: Score,
}

impl DocumentPage {
    /// Creates a page.
    pub fn new(page_number: u32, text: impl Into<String>, quality: Score) -> Self {
        Self {
            page_number,
            text: text.into(),
            quality,
        }
    }

    /// Returns the position within the owning document.
    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    /// Returns the extracted text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the upstream quality score.
    pub fn quality(&self) -> Score {
        self.quality
    }
}

/// A source document belonging to a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Upstream document identifier.
    doc_id: String,

    /// Ordered pages.
    pages: Vec<DocumentPage>,
}

impl Document {
    /// Creates a document.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if the document id is blank
    pub fn new(doc_id: impl Into<String>, pages: Vec<DocumentPage>) -> Result<Self, ValidationError> {
        let doc_id = doc_id.into();
        if doc_id.trim().is_empty() {
            return Err(ValidationError::empty_field("doc_id"));
        }
        Ok(Self { doc_id, pages })
    }

    /// Returns the upstream document identifier.
    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    /// Returns the pages in order.
    pub fn pages(&self) -> &[DocumentPage] {
        &self.pages
    }

    /// Returns the number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Folds page metadata into a compact summary.
    pub fn summary(&self) -> DocumentSummary {
        let mean_quality = if self.pages.is_empty() {
            Score::ZERO
        } else {
            let sum: f64 = self.pages.iter().map(|p| p.quality().value()).sum();
            Score::clamped(sum / self.pages.len() as f64)
        };
        DocumentSummary {
            doc_id: self.doc_id.clone(),
            page_count: self.pages.len(),
            mean_quality,
        }
    }
}

/// Per-document metadata folded during preprocessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub doc_id: String,
    pub page_count: usize,
    pub mean_quality: Score,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: u32, quality: f64) -> DocumentPage {
        DocumentPage::new(n, format!("page {} text", n), Score::try_new(quality).unwrap())
    }

    #[test]
    fn document_rejects_blank_id() {
        let result = Document::new("  ", vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn document_keeps_page_order() {
        let doc = Document::new("doc-1", vec![page(0, 0.9), page(1, 0.5)]).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages()[0].page_number(), 0);
        assert_eq!(doc.pages()[1].page_number(), 1);
    }

    #[test]
    fn summary_averages_page_quality() {
        let doc = Document::new("doc-1", vec![page(0, 0.8), page(1, 0.4)]).unwrap();
        let summary = doc.summary();
        assert_eq!(summary.doc_id, "doc-1");
        assert_eq!(summary.page_count, 2);
        assert!((summary.mean_quality.value() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn summary_of_empty_document_has_zero_quality() {
        let doc = Document::new("doc-empty", vec![]).unwrap();
        let summary = doc.summary();
        assert_eq!(summary.page_count, 0);
        assert!(summary.mean_quality.is_zero());
    }

    #[test]
    fn document_serde_roundtrip() {
        let doc = Document::new("doc-1", vec![page(0, 0.75)]).unwrap();
        let json = serde_json::to_string(&doc).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }
}
