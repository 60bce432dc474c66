//! File-based Session Store Adapter
//!
//! Stores each session as a YAML file on disk, named by session ID.
//! Suited to single-process deployments and local debugging; the files
//! are human-readable snapshots of the full aggregate.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::domain::foundation::{DomainError, ErrorCode, SessionId};
use crate::domain::session::{Session, SessionPatch};
use crate::ports::{SessionStore, SessionStoreError};

/// File-based storage for sessions.
///
/// Expired sessions are not deleted: the first operation that touches
/// one rewrites the file with status Expired and then reports the
/// session as absent, leaving an audit trail on disk.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    base_path: PathBuf,
}

impl FileSessionStore {
    /// Create a new file store rooted at a base directory.
    ///
    /// # Arguments
    /// * `base_path` - The directory session files are written under
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Get the file path for a session.
    fn session_file(&self, id: &SessionId) -> PathBuf {
        self.base_path.join(format!("{}.yaml", id))
    }

    /// Read and deserialize a session file.
    async fn read_session(&self, id: &SessionId) -> Result<Session, SessionStoreError> {
        let file_path = self.session_file(id);
        if !file_path.exists() {
            return Err(SessionStoreError::NotFound(*id));
        }

        let yaml = fs::read_to_string(&file_path)
            .await
            .map_err(|e| SessionStoreError::Storage(e.to_string()))?;
        serde_yaml::from_str(&yaml).map_err(|e| SessionStoreError::Storage(e.to_string()))
    }

    /// Serialize and write a session file.
    async fn write_session(&self, session: &Session) -> Result<(), SessionStoreError> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| SessionStoreError::Storage(e.to_string()))?;

        let yaml = serde_yaml::to_string(session)
            .map_err(|e| SessionStoreError::Storage(e.to_string()))?;
        fs::write(self.session_file(session.id()), yaml)
            .await
            .map_err(|e| SessionStoreError::Storage(e.to_string()))
    }

    /// Mark an expired session's file as Expired.
    ///
    /// Failures here only cost the audit trail, so they are logged
    /// rather than surfaced to the caller.
    async fn sweep_expired(&self, mut session: Session) {
        if session.expire().is_ok() {
            if let Err(err) = self.write_session(&session).await {
                tracing::warn!("Failed to mark session {} expired: {}", session.id(), err);
            }
        }
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
impl SessionStore for FileSessionStore {
    async fn create(&self, session: &Session) -> Result<SessionId, SessionStoreError> {
        if self.session_file(session.id()).exists() {
            return Err(SessionStoreError::Conflict(*session.id()));
        }
        self.write_session(session).await?;
        Ok(*session.id())
    }

    async fn get(&self, id: &SessionId) -> Result<Session, SessionStoreError> {
        let session = self.read_session(id).await?;
        if session.is_expired() {
            self.sweep_expired(session).await;
            return Err(SessionStoreError::NotFound(*id));
        }
        Ok(session)
    }

    async fn update(
        &self,
        id: &SessionId,
        patch: SessionPatch,
    ) -> Result<Session, SessionStoreError> {
        let mut session = self.read_session(id).await?;
        if session.is_expired() {
            self.sweep_expired(session).await;
            return Err(SessionStoreError::NotFound(*id));
        }
        session.apply_patch(patch).map_err(|err| patch_error(*id, err))?;
        self.write_session(&session).await?;
        Ok(session)
    }

    async fn touch_expiry(&self, id: &SessionId, ttl_secs: u64) -> Result<(), SessionStoreError> {
        let mut session = self.read_session(id).await?;
        if session.is_expired() {
            self.sweep_expired(session).await;
            return Err(SessionStoreError::NotFound(*id));
        }
        session
            .touch_expiry(ttl_secs)
            .map_err(|err| patch_error(*id, err))?;
        self.write_session(&session).await
    }
}
