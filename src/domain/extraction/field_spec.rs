//! Form field specifications.
//!
//! A FieldSpec describes one target form field: its label (the identity
//! key evidence is matched against), its type, and the value slots the
//! pipeline writes into. Field types are a closed set; only picklist and
//! radio fields carry allowed values, enforced at construction time.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ValidationError};

/// Closed set of form field types.
///
/// Only picklist and radio carry an allowed-value list; every other
/// variant accepts free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    Textarea,
    Picklist { allowed_values: Vec<String> },
    Radio { allowed_values: Vec<String> },
}

impl FieldKind {
    /// Returns true for types that accept arbitrary prose.
    pub fn is_free_text(&self) -> bool {
        matches!(self, FieldKind::Text | FieldKind::Textarea)
    }

    /// Returns the allowed values for constrained types.
    pub fn allowed_values(&self) -> Option<&[String]> {
        match self {
            FieldKind::Picklist { allowed_values } | FieldKind::Radio { allowed_values } => {
                Some(allowed_values)
            }
            _ => None,
        }
    }

    /// Checks whether a value is legal for this field type.
    ///
    /// Picklist and radio require an exact, case-sensitive match against
    /// the allowed values; no fuzzy matching or snapping.
    pub fn accepts(&self, value: &str) -> bool {
        match self.allowed_values() {
            Some(allowed) => allowed.iter().any(|v| v == value),
            None => true,
        }
    }

    /// Returns the type name used in logs and wire payloads.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Textarea => "textarea",
            FieldKind::Picklist { .. } => "picklist",
            FieldKind::Radio { .. } => "radio",
        }
    }
}

/// A single form field's type, constraints, and value slots.
///
/// # Invariants
///
/// - `label` is non-blank and is the field's identity key
/// - picklist/radio carry at least one allowed value
/// - a non-empty `target_value` on a picklist/radio field is always a
///   member of its allowed values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Identity key used to match extraction evidence to this field.
    label: String,

    /// Field type, with per-type constraints.
    kind: FieldKind,

    /// Whether the form marks this field as required.
    required: bool,

    /// Upstream default, forced empty before extraction.
    default_value: String,

    /// Value written by the prefill stage; empty until then.
    target_value: String,
}

impl FieldSpec {
    /// Creates a new field spec with empty value slots.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if the label is blank
    /// - `EmptyField` if a picklist/radio carries no allowed values
    pub fn new(
        label: impl Into<String>,
        kind: FieldKind,
        required: bool,
    ) -> Result<Self, ValidationError> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(ValidationError::empty_field("label"));
        }
        if let Some(allowed) = kind.allowed_values() {
            if allowed.is_empty() {
                return Err(ValidationError::empty_field("allowed_values"));
            }
        }
        Ok(Self {
            label,
            kind,
            required,
            default_value: String::new(),
            target_value: String::new(),
        })
    }

    /// Sets the upstream default value.
    ///
    /// Kept only until preprocessing, which forces it empty.
    pub fn with_default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = value.into();
        self
    }

    /// Returns the field label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the field type.
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Returns whether the field is required.
    pub fn required(&self) -> bool {
        self.required
    }

    /// Returns the upstream default value.
    pub fn default_value(&self) -> &str {
        &self.default_value
    }

    /// Returns the prefilled target value.
    pub fn target_value(&self) -> &str {
        &self.target_value
    }

    /// Returns true once a target value has been written.
    pub fn has_target(&self) -> bool {
        !self.target_value.is_empty()
    }

    /// Clears both value slots ahead of a fresh extraction pass.
    pub fn reset_for_extraction(&mut self) {
        self.default_value.clear();
        self.target_value.clear();
    }

    /// Writes the target value slot.
    ///
    /// An empty value clears the slot. For picklist/radio fields a
    /// non-empty value must exactly match an allowed value.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the value is not legal for this field type
    pub fn set_target(&mut self, value: impl Into<String>) -> Result<(), DomainError> {
        let value = value.into();
        if value.is_empty() {
            self.target_value.clear();
            return Ok(());
        }
        if !self.kind.accepts(&value) {
            return Err(DomainError::validation(
                "target_value",
                format!("'{}' is not an allowed value for field '{}'", value, self.label),
            ));
        }
        self.target_value = value;
        Ok(())
    }
}
