//! Stage enum for the canonical extraction pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One stage of the extraction pipeline.
///
/// The canonical order is fetch_record, preprocess, extract, prefill, qa.
/// Plans select a subset; execution always walks the canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    FetchRecord,
    Preprocess,
    Extract,
    Prefill,
    Qa,
}

impl Stage {
    /// Returns all stages in canonical pipeline order.
    pub fn all() -> &'static [Stage] {
        &[
            Stage::FetchRecord,
            Stage::Preprocess,
            Stage::Extract,
            Stage::Prefill,
            Stage::Qa,
        ]
    }

    /// Returns the zero-based position in the canonical order.
    pub fn order_index(&self) -> usize {
        Self::all()
            .iter()
            .position(|s| s == self)
            .expect("stage must be in ALL")
    }

    /// Returns the stage name used in step records and logs.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Stage::FetchRecord => "fetch_record",
            Stage::Preprocess => "preprocess",
            Stage::Extract => "extract",
            Stage::Prefill => "prefill",
            Stage::Qa => "qa",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}
