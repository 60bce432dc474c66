//! Session aggregate entity.
//!
//! Sessions carry conversational state for one record across workflow
//! runs. Each session belongs to one record and accumulates the
//! snapshots later runs reuse instead of recomputing.
//!
//! # Ownership
//!
//! Sessions reference workflow runs through their interaction history
//! but do NOT own them. Runs are managed by the Workflow module.

use crate::domain::extraction::{MergedField, PreparedInput};
use crate::domain::foundation::{
    DomainError, ErrorCode, RecordId, SessionId, SessionStatus, Stage, Timestamp,
};
use crate::domain::session::values::{InteractionTurn, ProcessingMetadata, SessionPatch};
use serde::{Deserialize, Serialize};

/// Session aggregate - conversational state for one record.
///
/// # Invariants
///
/// - `id` is globally unique
/// - `expires_at` is never earlier than `created_at`
/// - Expired sessions cannot be modified; reads treat them as absent
/// - `last_response` holds the merged template from the most recent
///   extraction, empty until one has completed
/// - `interaction_history` is append-only, one turn per finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier for this session.
    id: SessionId,

    /// Record this session converses about.
    record_id: RecordId,

    /// Current status (Active or Expired).
    status: SessionStatus,

    /// Preprocessed field specs and documents, replayed by later runs.
    input_snapshot: Option<PreparedInput>,

    /// Merged template produced by the most recent extraction.
    last_response: Vec<MergedField>,

    /// Past request/response turns, oldest first.
    interaction_history: Vec<InteractionTurn>,

    /// Stage completion flags and run counters.
    processing_metadata: ProcessingMetadata,

    /// When the session was created.
    created_at: Timestamp,

    /// When the session was last updated.
    updated_at: Timestamp,

    /// When the session stops being readable.
    expires_at: Timestamp,
}

impl Session {
    /// Create a fresh active session for a record with the given TTL.
    pub fn new(record_id: RecordId, ttl_secs: u64) -> Self {
        let now = Timestamp::now();
        Self {
            id: SessionId::new(),
            record_id,
            status: SessionStatus::Active,
            input_snapshot: None,
            last_response: Vec::new(),
            interaction_history: Vec::new(),
            processing_metadata: ProcessingMetadata::default(),
            created_at: now,
            updated_at: now,
            expires_at: now.plus_secs(ttl_secs),
        }
    }

    /// Reconstitute a session from persistence (no validation, no clock reads).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: SessionId,
        record_id: RecordId,
        status: SessionStatus,
        input_snapshot: Option<PreparedInput>,
        last_response: Vec<MergedField>,
        interaction_history: Vec<InteractionTurn>,
        processing_metadata: ProcessingMetadata,
        created_at: Timestamp,
        updated_at: Timestamp,
        expires_at: Timestamp,
    ) -> Self {
        Self {
            id,
            record_id,
            status,
            input_snapshot,
            last_response,
            interaction_history,
            processing_metadata,
            created_at,
            updated_at,
            expires_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the session ID.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Returns the record this session belongs to.
    pub fn record_id(&self) -> &RecordId {
        &self.record_id
    }

    /// Returns the current status.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Returns the stored preprocessed input, if any.
    pub fn input_snapshot(&self) -> Option<&PreparedInput> {
        self.input_snapshot.as_ref()
    }

    /// Returns the merged template from the most recent extraction.
    pub fn last_response(&self) -> &[MergedField] {
        &self.last_response
    }

    /// Returns the interaction history, oldest first.
    pub fn interaction_history(&self) -> &[InteractionTurn] {
        &self.interaction_history
    }

    /// Returns the stage completion metadata.
    pub fn processing_metadata(&self) -> &ProcessingMetadata {
        &self.processing_metadata
    }

    /// Returns when the session was created.
    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    /// Returns when the session was last updated.
    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    /// Returns the expiry deadline.
    pub fn expires_at(&self) -> &Timestamp {
        &self.expires_at
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns true if a merged template from a prior extraction is present.
    pub fn has_template(&self) -> bool {
        !self.last_response.is_empty()
    }

    /// Returns true if preprocessed input is available for replay.
    pub fn has_input(&self) -> bool {
        self.input_snapshot.is_some()
    }

    /// Returns true if the session is marked expired or its deadline passed.
    pub fn is_expired(&self) -> bool {
        self.status == SessionStatus::Expired || self.expires_at.has_passed()
    }

    /// Returns true if prior session state already covers the stage.
    ///
    /// Fetch and preprocess are satisfied by a stored input snapshot,
    /// extraction by a stored template, prefill and QA by their
    /// completion flags.
    pub fn is_stage_satisfied(&self, stage: Stage) -> bool {
        match stage {
            Stage::FetchRecord | Stage::Preprocess => self.has_input(),
            Stage::Extract => self.has_template(),
            Stage::Prefill | Stage::Qa => self.processing_metadata.is_completed(stage),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Fold the outcome of a finished run into the session.
    ///
    /// Replaces the snapshots the patch carries, marks the patch's
    /// completed stages, appends the interaction turn and bumps
    /// `updated_at`.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the session has expired
    pub fn apply_patch(&mut self, patch: SessionPatch) -> Result<(), DomainError> {
        self.ensure_active()?;

        if let Some(input) = patch.input_snapshot {
            self.input_snapshot = Some(input);
        }
        if let Some(response) = patch.last_response {
            self.last_response = response;
        }
        for stage in patch.completed_stages {
            self.processing_metadata.mark_completed(stage);
        }
        self.processing_metadata.record_run();
        self.interaction_history.push(patch.turn);
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Slide the expiry deadline forward from now.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the session has expired
    pub fn touch_expiry(&mut self, ttl_secs: u64) -> Result<(), DomainError> {
        self.ensure_active()?;

        let now = Timestamp::now();
        self.expires_at = now.plus_secs(ttl_secs);
        self.updated_at = now;
        Ok(())
    }

    /// Mark the session expired.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` if already expired
    pub fn expire(&mut self) -> Result<(), DomainError> {
        if !self.status.can_transition_to(&SessionStatus::Expired) {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Session is already expired",
            ));
        }

        self.status = SessionStatus::Expired;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Private helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Validates that the session can be modified.
    fn ensure_active(&self) -> Result<(), DomainError> {
        if self.is_expired() {
            Err(DomainError::new(
                ErrorCode::SessionNotFound,
                "Session has expired",
            )
            .with_detail("session_id", self.id.to_string()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Score, WorkflowId};
    use crate::domain::routing::Intent;

    fn test_record_id() -> RecordId {
        RecordId::new("REC-001").unwrap()
    }

    fn test_turn() -> InteractionTurn {
        InteractionTurn::new("remplir", "done", Intent::PrefillForm, WorkflowId::new())
    }

    fn test_merged(label: &str) -> MergedField {
        MergedField::available(label, "value", Score::clamped(0.8), 0).unwrap()
    }

    fn test_session() -> Session {
        Session::new(test_record_id(), 3600)
    }

    // Construction tests

    #[test]
    fn new_session_is_active() {
        let session = test_session();
        assert_eq!(session.status(), SessionStatus::Active);
        assert!(!session.is_expired());
    }

    #[test]
    fn new_session_has_no_snapshots() {
        let session = test_session();
        assert!(!session.has_template());
        assert!(!session.has_input());
        assert!(session.interaction_history().is_empty());
    }

    #[test]
    fn new_session_expiry_is_after_creation() {
        let session = test_session();
        assert!(session.expires_at().is_after(session.created_at()));
    }

    #[test]
    fn zero_ttl_session_is_immediately_expired() {
        let session = Session::new(test_record_id(), 0);
        assert!(session.is_expired());
    }

    // Patch tests

    #[test]
    fn apply_patch_merges_snapshots_and_appends_history() {
        let mut session = test_session();
        let patch = SessionPatch::new(test_turn())
            .with_last_response(vec![test_merged("nom")])
            .with_completed_stage(Stage::Extract);

        session.apply_patch(patch).unwrap();

        assert!(session.has_template());
        assert_eq!(session.last_response().len(), 1);
        assert_eq!(session.interaction_history().len(), 1);
        assert_eq!(session.processing_metadata().total_runs, 1);
        assert!(session.processing_metadata().is_completed(Stage::Extract));
    }

    #[test]
    fn apply_patch_without_response_keeps_previous_template() {
        let mut session = test_session();
        session
            .apply_patch(SessionPatch::new(test_turn()).with_last_response(vec![test_merged("nom")]))
            .unwrap();

        session.apply_patch(SessionPatch::new(test_turn())).unwrap();

        assert!(session.has_template());
        assert_eq!(session.interaction_history().len(), 2);
        assert_eq!(session.processing_metadata().total_runs, 2);
    }

    #[test]
    fn apply_patch_fails_when_expired() {
        let mut session = test_session();
        session.expire().unwrap();

        let err = session.apply_patch(SessionPatch::new(test_turn())).unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionNotFound);
        assert!(session.interaction_history().is_empty());
    }

    // Expiry tests

    #[test]
    fn touch_expiry_slides_deadline_forward() {
        let mut session = Session::new(test_record_id(), 60);
        let before = *session.expires_at();

        session.touch_expiry(3600).unwrap();
        assert!(session.expires_at().is_after(&before));
    }

    #[test]
    fn expire_changes_status() {
        let mut session = test_session();
        session.expire().unwrap();
        assert_eq!(session.status(), SessionStatus::Expired);
        assert!(session.is_expired());
    }

    #[test]
    fn expire_twice_fails() {
        let mut session = test_session();
        session.expire().unwrap();
        let err = session.expire().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }

    // Stage satisfaction tests

    #[test]
    fn fresh_session_satisfies_no_stage() {
        let session = test_session();
        assert!(!session.is_stage_satisfied(Stage::FetchRecord));
        assert!(!session.is_stage_satisfied(Stage::Preprocess));
        assert!(!session.is_stage_satisfied(Stage::Extract));
        assert!(!session.is_stage_satisfied(Stage::Prefill));
        assert!(!session.is_stage_satisfied(Stage::Qa));
    }

    #[test]
    fn template_satisfies_extract_but_not_prefill() {
        let mut session = test_session();
        let patch = SessionPatch::new(test_turn())
            .with_last_response(vec![test_merged("nom")])
            .with_completed_stage(Stage::Prefill);
        session.apply_patch(patch).unwrap();

        assert!(session.is_stage_satisfied(Stage::Extract));
        assert!(session.is_stage_satisfied(Stage::Prefill));
        assert!(!session.is_stage_satisfied(Stage::Qa));
        assert!(!session.is_stage_satisfied(Stage::FetchRecord));
    }

    // Reconstitution tests

    #[test]
    fn reconstitute_preserves_all_state() {
        let original = {
            let mut session = test_session();
            let patch =
                SessionPatch::new(test_turn()).with_last_response(vec![test_merged("nom")]);
            session.apply_patch(patch).unwrap();
            session
        };

        let rebuilt = Session::reconstitute(
            *original.id(),
            original.record_id().clone(),
            original.status(),
            original.input_snapshot().cloned(),
            original.last_response().to_vec(),
            original.interaction_history().to_vec(),
            original.processing_metadata().clone(),
            *original.created_at(),
            *original.updated_at(),
            *original.expires_at(),
        );

        assert_eq!(rebuilt, original);
    }

    #[test]
    fn session_serde_roundtrip() {
        let mut session = test_session();
        let patch = SessionPatch::new(test_turn())
            .with_last_response(vec![test_merged("nom")])
            .with_completed_stage(Stage::Extract);
        session.apply_patch(patch).unwrap();

        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }
}
