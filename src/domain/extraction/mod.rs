//! Extraction domain module.
//!
//! Field specifications, source documents, per-page evidence, and the
//! aggregation that reconciles evidence into one value per field.

mod aggregator;
mod candidate;
mod document;
mod field_spec;
mod merged;
mod preprocess;

pub use aggregator::{AggregationPolicy, EvidenceAggregator};
pub use candidate::PageCandidate;
pub use document::{Document, DocumentPage, DocumentSummary};
pub use field_spec::{FieldKind, FieldSpec};
pub use merged::{MergedField, MergedValue, NOT_AVAILABLE};
pub use preprocess::{PreparedInput, Preprocessor};
