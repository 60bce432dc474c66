//! Retry classification for upstream call errors.

/// Classifies whether a failed upstream call is worth retrying.
///
/// Port error enums implement this so the call gateway can decide
/// between backing off and giving up without knowing the error type.
pub trait Retryable {
    /// Returns true if a later attempt could succeed.
    fn is_retryable(&self) -> bool;
}
