//! Fixture Record Source Adapter
//!
//! Serves record bundles from YAML files on disk. Intended for
//! development and tests; each record lives in `<base>/<record_id>.yaml`
//! with the same payload shape the HTTP source decodes.

use async_trait::async_trait;
use std::path::PathBuf;

use super::payload::RecordPayload;
use crate::domain::foundation::RecordId;
use crate::ports::{RecordBundle, RecordSource, RecordSourceError};

/// File-backed record source.
#[derive(Debug, Clone)]
pub struct FixtureRecordSource {
    base_path: PathBuf,
}

impl FixtureRecordSource {
    /// Creates a source rooted at the given fixture directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Resolves the fixture file for a record.
    ///
    /// Record ids are upstream-owned strings; anything that could
    /// escape the fixture directory resolves to no file at all.
    fn record_file(&self, record_id: &RecordId) -> Option<PathBuf> {
        let id = record_id.as_str();
        if id.contains('/') || id.contains('\\') || id.contains("..") {
            return None;
        }
        Some(self.base_path.join(format!("{}.yaml", id)))
    }
}

#[async_trait]
impl RecordSource for FixtureRecordSource {
    async fn fetch_record(&self, record_id: &RecordId) -> Result<RecordBundle, RecordSourceError> {
        let path = self
            .record_file(record_id)
            .ok_or_else(|| RecordSourceError::not_found(record_id.as_str()))?;

        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RecordSourceError::not_found(record_id.as_str()));
            }
            Err(e) => {
                return Err(RecordSourceError::unavailable(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let payload: RecordPayload = serde_yaml::from_str(&raw)
            .map_err(|e| RecordSourceError::malformed(format!("{}: {}", path.display(), e)))?;
        payload.into_bundle()
    }
}
