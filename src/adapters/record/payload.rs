//! Upstream record payload types.
//!
//! Wire shape shared by the record source adapters: the HTTP source
//! decodes it from JSON, the fixture source from YAML. Conversion goes
//! through the domain constructors so a malformed payload is caught at
//! the boundary instead of deep inside a run.

use serde::Deserialize;

use crate::domain::extraction::{Document, DocumentPage, FieldKind, FieldSpec};
use crate::domain::foundation::Score;
use crate::ports::{RecordBundle, RecordSourceError};

/// Everything the upstream service returns for one record.
#[derive(Debug, Deserialize)]
pub(super) struct RecordPayload {
    #[serde(default)]
    pub documents: Vec<DocumentPayload>,
    #[serde(default)]
    pub fields: Vec<FieldPayload>,
}

/// One scanned document with its extracted pages.
#[derive(Debug, Deserialize)]
pub(super) struct DocumentPayload {
    pub doc_id: String,
    #[serde(default)]
    pub pages: Vec<PagePayload>,
}

/// One page of upstream-extracted text.
#[derive(Debug, Deserialize)]
pub(super) struct PagePayload {
    pub page_number: u32,
    pub text: String,
    pub quality: f64,
}

/// One form field description.
#[derive(Debug, Deserialize)]
pub(super) struct FieldPayload {
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default_value: String,
}

impl RecordPayload {
    /// Converts the decoded payload into a domain bundle.
    ///
    /// # Errors
    ///
    /// - `Malformed` if a page quality is outside the unit interval
    /// - `Malformed` if a document or field fails domain validation
    pub(super) fn into_bundle(self) -> Result<RecordBundle, RecordSourceError> {
        let mut documents = Vec::with_capacity(self.documents.len());
        for doc in self.documents {
            let mut pages = Vec::with_capacity(doc.pages.len());
            for page in doc.pages {
                let quality = Score::try_new(page.quality).map_err(|e| {
                    RecordSourceError::malformed(format!(
                        "document '{}' page {}: {}",
                        doc.doc_id, page.page_number, e
                    ))
                })?;
                pages.push(DocumentPage::new(page.page_number, page.text, quality));
            }
            let document = Document::new(doc.doc_id, pages)
                .map_err(|e| RecordSourceError::malformed(e.to_string()))?;
            documents.push(document);
        }

        let mut field_specs = Vec::with_capacity(self.fields.len());
        for field in self.fields {
            let spec = FieldSpec::new(field.label, field.kind, field.required)
                .map_err(|e| RecordSourceError::malformed(e.to_string()))?
                .with_default_value(field.default_value);
            field_specs.push(spec);
        }

        Ok(RecordBundle::new(documents, field_specs))
    }
}
