//! Merged field results and the not-available sentinel.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{Score, ValidationError};

/// Sentinel value expressing "no usable evidence" for a field.
///
/// This literal, never an empty string and never a null, is the only
/// legal way a merged result says a value could not be established.
pub const NOT_AVAILABLE: &str = "non disponible";

/// The reconciled value of one field after aggregation.
///
/// Serializes as a plain string; the sentinel literal maps to
/// `NotAvailable` in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MergedValue {
    Available(String),
    NotAvailable,
}

impl MergedValue {
    /// Returns true when actual evidence won.
    pub fn is_available(&self) -> bool {
        matches!(self, MergedValue::Available(_))
    }

    /// Returns the wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            MergedValue::Available(value) => value,
            MergedValue::NotAvailable => NOT_AVAILABLE,
        }
    }
}

impl From<String> for MergedValue {
    fn from(value: String) -> Self {
        if value.is_empty() || value == NOT_AVAILABLE {
            MergedValue::NotAvailable
        } else {
            MergedValue::Available(value)
        }
    }
}

impl From<MergedValue> for String {
    fn from(value: MergedValue) -> Self {
        match value {
            MergedValue::Available(v) => v,
            MergedValue::NotAvailable => NOT_AVAILABLE.to_string(),
        }
    }
}

impl fmt::Display for MergedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The single reconciled value + quality score for a field.
///
/// # Invariants
///
/// - `quality_score` is zero exactly when the value is the sentinel
/// - an available value is never blank and never the sentinel literal
/// - `source_page` is present exactly when the value is available
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedField {
    field_label: String,
    value: MergedValue,
    quality_score: Score,
    source_page: Option<u32>,
}

impl MergedField {
    /// Creates a merged field carrying winning evidence.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if the label or value is blank
    /// - `InvalidFormat` if the value is the sentinel literal or the
    ///   quality score is zero
    pub fn available(
        field_label: impl Into<String>,
        value: impl Into<String>,
        quality_score: Score,
        source_page: u32,
    ) -> Result<Self, ValidationError> {
        let field_label = field_label.into();
        if field_label.trim().is_empty() {
            return Err(ValidationError::empty_field("field_label"));
        }
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::empty_field("value"));
        }
        if value == NOT_AVAILABLE {
            return Err(ValidationError::invalid_format(
                "value",
                "the sentinel cannot be an available value",
            ));
        }
        if quality_score.is_zero() {
            return Err(ValidationError::invalid_format(
                "quality_score",
                "an available value requires positive quality",
            ));
        }
        Ok(Self {
            field_label,
            value: MergedValue::Available(value),
            quality_score,
            source_page: Some(source_page),
        })
    }

    /// Creates the sentinel result for a field with no usable evidence.
    pub fn not_available(field_label: impl Into<String>) -> Self {
        Self {
            field_label: field_label.into(),
            value: MergedValue::NotAvailable,
            quality_score: Score::ZERO,
            source_page: None,
        }
    }

    /// Returns the field label.
    pub fn field_label(&self) -> &str {
        &self.field_label
    }

    /// Returns the merged value.
    pub fn value(&self) -> &MergedValue {
        &self.value
    }

    /// Returns the quality score backing the value.
    pub fn quality_score(&self) -> Score {
        self.quality_score
    }

    /// Returns the page the winning evidence came from.
    pub fn source_page(&self) -> Option<u32> {
        self.source_page
    }

    /// Returns true when actual evidence won.
    pub fn is_available(&self) -> bool {
        self.value.is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(v: f64) -> Score {
        Score::try_new(v).unwrap()
    }

    #[test]
    fn available_requires_positive_quality() {
        let result = MergedField::available("amount", "1200", Score::ZERO, 0);
        assert!(result.is_err());
    }

    #[test]
    fn available_rejects_sentinel_literal() {
        let result = MergedField::available("amount", NOT_AVAILABLE, score(0.5), 0);
        assert!(result.is_err());
    }

    #[test]
    fn available_rejects_empty_value() {
        let result = MergedField::available("amount", "", score(0.5), 0);
        assert!(result.is_err());
    }

    #[test]
    fn not_available_has_zero_quality_and_no_page() {
        let field = MergedField::not_available("amount");
        assert!(!field.is_available());
        assert!(field.quality_score().is_zero());
        assert_eq!(field.source_page(), None);
        assert_eq!(field.value().as_str(), NOT_AVAILABLE);
    }

    #[test]
    fn available_carries_evidence() {
        let field = MergedField::available("amount", "1200", score(0.72), 2).unwrap();
        assert!(field.is_available());
        assert_eq!(field.value().as_str(), "1200");
        assert_eq!(field.source_page(), Some(2));
        assert!((field.quality_score().value() - 0.72).abs() < 1e-9);
    }

    #[test]
    fn merged_value_serializes_as_plain_string() {
        let value = MergedValue::Available("Lyon".to_string());
        assert_eq!(serde_json::to_string(&value).unwrap(), "\"Lyon\"");

        let sentinel = MergedValue::NotAvailable;
        assert_eq!(
            serde_json::to_string(&sentinel).unwrap(),
            format!("\"{}\"", NOT_AVAILABLE)
        );
    }

    #[test]
    fn merged_value_deserializes_sentinel_literal() {
        let value: MergedValue =
            serde_json::from_str(&format!("\"{}\"", NOT_AVAILABLE)).unwrap();
        assert_eq!(value, MergedValue::NotAvailable);
    }

    #[test]
    fn merged_value_deserializes_empty_string_as_not_available() {
        let value: MergedValue = serde_json::from_str("\"\"").unwrap();
        assert_eq!(value, MergedValue::NotAvailable);
    }

    #[test]
    fn merged_field_serde_roundtrip() {
        let field = MergedField::available("city", "Lyon", score(0.6), 1).unwrap();
        let json = serde_json::to_string(&field).unwrap();
        let back: MergedField = serde_json::from_str(&json).unwrap();
        assert_eq!(back, field);
    }
}
