//! Session store port.
//!
//! Defines the contract for persisting and retrieving Session aggregates
//! across workflow runs. Implementations own TTL enforcement.
//!
//! # Design
//!
//! - **Expiry at read time**: a session past its deadline reads as not
//!   found, whether or not the store has reaped it yet
//! - **Patch-based updates**: callers hand over a `SessionPatch`; the
//!   store loads, applies and persists atomically

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{ErrorCode, SessionId};
use crate::domain::session::{Session, SessionPatch};

/// Store port for Session aggregate persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new session.
    ///
    /// # Errors
    ///
    /// - `Conflict` if a session with the same ID already exists
    /// - `Storage` on persistence failure
    async fn create(&self, session: &Session) -> Result<SessionId, SessionStoreError>;

    /// Load a session by ID.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the session does not exist or has expired
    /// - `Storage` on persistence failure
    async fn get(&self, id: &SessionId) -> Result<Session, SessionStoreError>;

    /// Fold a patch into a stored session and return the updated state.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the session does not exist or has expired
    /// - `Storage` on persistence failure
    async fn update(
        &self,
        id: &SessionId,
        patch: SessionPatch,
    ) -> Result<Session, SessionStoreError>;

    /// Slide a session's expiry deadline forward from now.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the session does not exist or has expired
    /// - `Storage` on persistence failure
    async fn touch_expiry(&self, id: &SessionId, ttl_secs: u64) -> Result<(), SessionStoreError>;
}

/// Session store errors.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    /// Session does not exist or has expired.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// A session with this ID already exists.
    #[error("session {0} already exists")]
    Conflict(SessionId),

    /// The stored session rejected the mutation.
    #[error("invalid session state: {0}")]
    InvalidState(String),

    /// Underlying storage failed.
    #[error("session storage failed: {0}")]
    Storage(String),
}

impl SessionStoreError {
    /// Maps the error onto its stable wire code.
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionStoreError::NotFound(_) => ErrorCode::SessionNotFound,
            SessionStoreError::Conflict(_) => ErrorCode::Conflict,
            SessionStoreError::InvalidState(_) => ErrorCode::InvalidStateTransition,
            SessionStoreError::Storage(_) => ErrorCode::StorageError,
        }
    }
}
