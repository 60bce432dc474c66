//! In-Memory Session Store Adapter
//!
//! Keeps sessions in a process-local map. Useful for testing and
//! development; nothing survives a restart.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, SessionId};
use crate::domain::session::{Session, SessionPatch};
use crate::ports::{SessionStore, SessionStoreError};

/// In-memory storage for sessions.
///
/// Expiry is enforced lazily: an expired session is evicted the first
/// time any operation touches it, and reads treat it as absent.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
}

impl InMemorySessionStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored sessions (useful for tests).
    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }

    /// Get the number of stored sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn patch_error(id: SessionId, err: DomainError) -> SessionStoreError {
    if err.code == ErrorCode::SessionNotFound {
        SessionStoreError::NotFound(id)
    } else {
        SessionStoreError::InvalidState(err.to_string())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: &Session) -> Result<SessionId, SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(session.id()) {
            return Err(SessionStoreError::Conflict(*session.id()));
        }
        sessions.insert(*session.id(), session.clone());
        Ok(*session.id())
    }

    async fn get(&self, id: &SessionId) -> Result<Session, SessionStoreError> {
        let sessions = self.sessions.read().await;
        let session = sessions
            .get(id)
            .cloned()
            .ok_or(SessionStoreError::NotFound(*id))?;
        drop(sessions);

        if session.is_expired() {
            self.sessions.write().await.remove(id);
            return Err(SessionStoreError::NotFound(*id));
        }
        Ok(session)
    }

    async fn update(
        &self,
        id: &SessionId,
        patch: SessionPatch,
    ) -> Result<Session, SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id).ok_or(SessionStoreError::NotFound(*id))?;
        if session.is_expired() {
            sessions.remove(id);
            return Err(SessionStoreError::NotFound(*id));
        }
        session.apply_patch(patch).map_err(|err| patch_error(*id, err))?;
        Ok(session.clone())
    }

    async fn touch_expiry(&self, id: &SessionId, ttl_secs: u64) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id).ok_or(SessionStoreError::NotFound(*id))?;
        if session.is_expired() {
            sessions.remove(id);
            return Err(SessionStoreError::NotFound(*id));
        }
        session
            .touch_expiry(ttl_secs)
            .map_err(|err| patch_error(*id, err))
    }
}
