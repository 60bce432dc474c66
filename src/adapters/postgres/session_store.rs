//! PostgreSQL implementation of SessionStore.
//!
//! Persists Session aggregates to PostgreSQL. Scalar fields map to
//! plain columns; the nested snapshots (prepared input, merged
//! template, history, metadata) are stored as JSONB.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE sessions (
//!     id UUID PRIMARY KEY,
//!     record_id TEXT NOT NULL,
//!     status TEXT NOT NULL,
//!     input_snapshot JSONB,
//!     last_response JSONB NOT NULL,
//!     interaction_history JSONB NOT NULL,
//!     processing_metadata JSONB NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL,
//!     expires_at TIMESTAMPTZ NOT NULL
//! );
//! ```

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{PgPool, Row};

use crate::domain::foundation::{
    DomainError, ErrorCode, RecordId, SessionId, SessionStatus, Timestamp,
};
use crate::domain::session::{Session, SessionPatch};
use crate::ports::{SessionStore, SessionStoreError};

/// PostgreSQL implementation of SessionStore.
///
/// Expired sessions are kept with status `expired` rather than
/// deleted; reads report them as absent.
#[derive(Clone)]
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    /// Creates a new PostgresSessionStore.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads a session row without the expiry sweep.
    async fn read_session(&self, id: &SessionId) -> Result<Session, SessionStoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, record_id, status, input_snapshot, last_response,
                   interaction_history, processing_metadata,
                   created_at, updated_at, expires_at
            FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SessionStoreError::Storage(format!("Failed to fetch session: {}", e)))?;

        match row {
            Some(row) => row_to_session(row),
            None => Err(SessionStoreError::NotFound(*id)),
        }
    }

    /// Writes every mutable column back for an existing session.
    async fn write_session(&self, session: &Session) -> Result<(), SessionStoreError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions SET
                status = $2,
                input_snapshot = $3,
                last_response = $4,
                interaction_history = $5,
                processing_metadata = $6,
                updated_at = $7,
                expires_at = $8
            WHERE id = $1
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session_status_to_str(session.status()))
        .bind(to_json_opt(session.input_snapshot(), "input_snapshot")?)
        .bind(to_json(&session.last_response(), "last_response")?)
        .bind(to_json(&session.interaction_history(), "interaction_history")?)
        .bind(to_json(session.processing_metadata(), "processing_metadata")?)
        .bind(session.updated_at().as_datetime())
        .bind(session.expires_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| SessionStoreError::Storage(format!("Failed to update session: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(SessionStoreError::NotFound(*session.id()));
        }
        Ok(())
    }

    /// Marks an expired session's row as Expired.
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

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn create(&self, session: &Session) -> Result<SessionId, SessionStoreError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (
                id, record_id, status, input_snapshot, last_response,
                interaction_history, processing_metadata,
                created_at, updated_at, expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.record_id().as_str())
        .bind(session_status_to_str(session.status()))
        .bind(to_json_opt(session.input_snapshot(), "input_snapshot")?)
        .bind(to_json(&session.last_response(), "last_response")?)
        .bind(to_json(&session.interaction_history(), "interaction_history")?)
        .bind(to_json(session.processing_metadata(), "processing_metadata")?)
        .bind(session.created_at().as_datetime())
        .bind(session.updated_at().as_datetime())
        .bind(session.expires_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                SessionStoreError::Conflict(*session.id())
            } else {
                SessionStoreError::Storage(format!("Failed to insert session: {}", e))
            }
        })?;

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

// ════════════════════════════════════════════════════════════════════════════
// Helper functions
// ════════════════════════════════════════════════════════════════════════════

fn session_status_to_str(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Active => "active",
        SessionStatus::Expired => "expired",
    }
}

fn str_to_session_status(s: &str) -> Result<SessionStatus, SessionStoreError> {
    match s {
        "active" => Ok(SessionStatus::Active),
        "expired" => Ok(SessionStatus::Expired),
        _ => Err(SessionStoreError::Storage(format!(
            "Invalid session status: {}",
            s
        ))),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.kind() == sqlx::error::ErrorKind::UniqueViolation)
        .unwrap_or(false)
}

fn patch_error(id: SessionId, err: DomainError) -> SessionStoreError {
    if err.code == ErrorCode::SessionNotFound {
        SessionStoreError::NotFound(id)
    } else {
        SessionStoreError::InvalidState(err.to_string())
    }
}

fn to_json<T: Serialize>(value: &T, column: &str) -> Result<serde_json::Value, SessionStoreError> {
    serde_json::to_value(value)
        .map_err(|e| SessionStoreError::Storage(format!("Failed to serialize {}: {}", column, e)))
}

fn to_json_opt<T: Serialize>(
    value: Option<&T>,
    column: &str,
) -> Result<Option<serde_json::Value>, SessionStoreError> {
    value.map(|v| to_json(v, column)).transpose()
}

fn from_json<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
    column: &str,
) -> Result<T, SessionStoreError> {
    serde_json::from_value(value)
        .map_err(|e| SessionStoreError::Storage(format!("Failed to deserialize {}: {}", column, e)))
}

fn row_to_session(row: sqlx::postgres::PgRow) -> Result<Session, SessionStoreError> {
    let id: uuid::Uuid = row
        .try_get("id")
        .map_err(|e| SessionStoreError::Storage(format!("Failed to get id: {}", e)))?;

    let record_id: String = row
        .try_get("record_id")
        .map_err(|e| SessionStoreError::Storage(format!("Failed to get record_id: {}", e)))?;
    let record_id = RecordId::new(record_id)
        .map_err(|e| SessionStoreError::Storage(format!("Invalid record_id: {}", e)))?;

    let status_str: String = row
        .try_get("status")
        .map_err(|e| SessionStoreError::Storage(format!("Failed to get status: {}", e)))?;
    let status = str_to_session_status(&status_str)?;

    let input_snapshot: Option<serde_json::Value> = row
        .try_get("input_snapshot")
        .map_err(|e| SessionStoreError::Storage(format!("Failed to get input_snapshot: {}", e)))?;
    let input_snapshot = input_snapshot
        .map(|v| from_json(v, "input_snapshot"))
        .transpose()?;

    let last_response: serde_json::Value = row
        .try_get("last_response")
        .map_err(|e| SessionStoreError::Storage(format!("Failed to get last_response: {}", e)))?;
    let last_response = from_json(last_response, "last_response")?;

    let interaction_history: serde_json::Value = row.try_get("interaction_history").map_err(|e| {
        SessionStoreError::Storage(format!("Failed to get interaction_history: {}", e))
    })?;
    let interaction_history = from_json(interaction_history, "interaction_history")?;

    let processing_metadata: serde_json::Value = row.try_get("processing_metadata").map_err(|e| {
        SessionStoreError::Storage(format!("Failed to get processing_metadata: {}", e))
    })?;
    let processing_metadata = from_json(processing_metadata, "processing_metadata")?;

    let created_at: chrono::DateTime<chrono::Utc> = row
        .try_get("created_at")
        .map_err(|e| SessionStoreError::Storage(format!("Failed to get created_at: {}", e)))?;
    let updated_at: chrono::DateTime<chrono::Utc> = row
        .try_get("updated_at")
        .map_err(|e| SessionStoreError::Storage(format!("Failed to get updated_at: {}", e)))?;
    let expires_at: chrono::DateTime<chrono::Utc> = row
        .try_get("expires_at")
        .map_err(|e| SessionStoreError::Storage(format!("Failed to get expires_at: {}", e)))?;

    Ok(Session::reconstitute(
        SessionId::from_uuid(id),
        record_id,
        status,
        input_snapshot,
        last_response,
        interaction_history,
        processing_metadata,
        Timestamp::from_datetime(created_at),
        Timestamp::from_datetime(updated_at),
        Timestamp::from_datetime(expires_at),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_status_conversion_roundtrips() {
        for status in [SessionStatus::Active, SessionStatus::Expired] {
            assert_eq!(
                str_to_session_status(session_status_to_str(status)).unwrap(),
                status
            );
        }
    }

    #[test]
    fn str_to_session_status_rejects_invalid() {
        assert!(str_to_session_status("archived").is_err());
    }

    #[test]
    fn json_helpers_roundtrip_optional_columns() {
        let none: Option<&Vec<String>> = None;
        assert!(to_json_opt(none, "input_snapshot").unwrap().is_none());

        let values = vec!["a".to_string(), "b".to_string()];
        let json = to_json(&values, "last_response").unwrap();
        let back: Vec<String> = from_json(json, "last_response").unwrap();
        assert_eq!(back, values);
    }
}
