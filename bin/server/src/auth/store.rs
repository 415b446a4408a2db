//! Session persistence.
//!
//! Sessions are stored whole, keyed by their opaque id. The in-memory store
//! is the default; the PostgreSQL store is used when a database is
//! configured.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use groupgate_access::{Session, SessionId};
use rootcause::prelude::Report;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::SessionStoreError;

/// Storage for authenticated sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts or replaces a session.
    async fn save(&self, session: &Session) -> Result<(), Report<SessionStoreError>>;

    /// Finds a session by ID.
    async fn find(&self, id: &SessionId) -> Result<Option<Session>, Report<SessionStoreError>>;

    /// Records activity on an existing session.
    ///
    /// Never recreates a session that has been deleted. Returns false if no
    /// session with this ID exists.
    async fn touch(
        &self,
        id: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<bool, Report<SessionStoreError>>;

    /// Deletes a session by ID (logout).
    async fn delete(&self, id: &SessionId) -> Result<(), Report<SessionStoreError>>;

    /// Deletes expired sessions, returning how many were removed.
    async fn delete_expired(&self) -> Result<u64, Report<SessionStoreError>>;
}

/// Process-local session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns true if no sessions are stored.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, session: &Session) -> Result<(), Report<SessionStoreError>> {
        self.sessions
            .write()
            .await
            .insert(session.id().clone(), session.clone());
        Ok(())
    }

    async fn find(&self, id: &SessionId) -> Result<Option<Session>, Report<SessionStoreError>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn touch(
        &self,
        id: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<bool, Report<SessionStoreError>> {
        match self.sessions.write().await.get_mut(id) {
            Some(session) => {
                session.touch(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &SessionId) -> Result<(), Report<SessionStoreError>> {
        self.sessions.write().await.remove(id);
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, Report<SessionStoreError>> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.is_valid(now));
        Ok((before - sessions.len()) as u64)
    }
}

/// Row type for session queries.
#[derive(FromRow)]
struct SessionRow {
    id: String,
    data: serde_json::Value,
}

impl SessionRow {
    fn try_into_session(self) -> Result<Session, SessionStoreError> {
        serde_json::from_value(self.data).map_err(|e| SessionStoreError::InvalidRecord {
            session_id: self.id,
            details: e.to_string(),
        })
    }
}

fn backend_error(e: sqlx::Error) -> SessionStoreError {
    SessionStoreError::Backend {
        details: e.to_string(),
    }
}

/// PostgreSQL-backed session store.
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Creates a new session store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn save(&self, session: &Session) -> Result<(), Report<SessionStoreError>> {
        let data = serde_json::to_value(session).map_err(|e| SessionStoreError::InvalidRecord {
            session_id: session.id().to_string(),
            details: e.to_string(),
        })?;

        sqlx::query(
            r#"
            INSERT INTO sessions (id, data, expires_at, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (id) DO UPDATE
            SET data = EXCLUDED.data, expires_at = EXCLUDED.expires_at, updated_at = NOW()
            "#,
        )
        .bind(session.id().as_str())
        .bind(data)
        .bind(session.expires_at())
        .execute(&self.pool)
        .await
        .map_err(backend_error)?;

        Ok(())
    }

    async fn find(&self, id: &SessionId) -> Result<Option<Session>, Report<SessionStoreError>> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, data
            FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_error)?;

        match row {
            Some(r) => Ok(Some(r.try_into_session()?)),
            None => Ok(None),
        }
    }

    async fn touch(
        &self,
        id: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<bool, Report<SessionStoreError>> {
        let last_activity_at =
            serde_json::to_value(now).map_err(|e| SessionStoreError::InvalidRecord {
                session_id: id.to_string(),
                details: e.to_string(),
            })?;

        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET data = jsonb_set(data, '{last_activity_at}', $2), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .bind(last_activity_at)
        .execute(&self.pool)
        .await
        .map_err(backend_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &SessionId) -> Result<(), Report<SessionStoreError>> {
        sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(backend_error)?;

        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, Report<SessionStoreError>> {
        let result = sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE expires_at < NOW()
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend_error)?;

        Ok(result.rows_affected())
    }
}

/// Generates a unique session ID using ULID.
pub fn generate_session_id() -> SessionId {
    SessionId::new(ulid::Ulid::new().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use groupgate_access::{RoleSet, UserProfile};

    fn session(id: &str, duration: Duration) -> Session {
        Session::new(
            SessionId::new(id.to_string()),
            UserProfile::new("sub".to_string(), "iss".to_string()),
            RoleSet::none(),
            duration,
        )
    }

    #[tokio::test]
    async fn memory_store_round_trips_sessions() {
        let store = MemorySessionStore::new();
        let stored = session("a", Duration::hours(1));

        store.save(&stored).await.unwrap();

        let found = store.find(stored.id()).await.unwrap();
        assert_eq!(found, Some(stored.clone()));

        store.delete(stored.id()).await.unwrap();
        assert_eq!(store.find(stored.id()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_save_replaces_existing() {
        let store = MemorySessionStore::new();
        let mut stored = session("a", Duration::hours(1));
        store.save(&stored).await.unwrap();

        let later = stored.last_activity_at() + Duration::minutes(5);
        stored.touch(later);
        store.save(&stored).await.unwrap();

        assert_eq!(store.len().await, 1);
        let found = store.find(stored.id()).await.unwrap().unwrap();
        assert_eq!(found.last_activity_at(), later);
    }

    #[tokio::test]
    async fn memory_store_touch_updates_activity_only() {
        let store = MemorySessionStore::new();
        let stored = session("a", Duration::hours(1));
        store.save(&stored).await.unwrap();

        let later = stored.last_activity_at() + Duration::minutes(5);
        assert!(store.touch(stored.id(), later).await.unwrap());

        let found = store.find(stored.id()).await.unwrap().unwrap();
        assert_eq!(found.last_activity_at(), later);
        assert_eq!(found.roles(), stored.roles());
        assert_eq!(found.expires_at(), stored.expires_at());
    }

    #[tokio::test]
    async fn memory_store_touch_never_recreates_deleted_session() {
        let store = MemorySessionStore::new();
        let stored = session("a", Duration::hours(1));
        store.save(&stored).await.unwrap();
        store.delete(stored.id()).await.unwrap();

        assert!(!store.touch(stored.id(), Utc::now()).await.unwrap());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn memory_store_deletes_only_expired_sessions() {
        let store = MemorySessionStore::new();
        store.save(&session("live", Duration::hours(1))).await.unwrap();
        store
            .save(&session("dead", Duration::seconds(-1)))
            .await
            .unwrap();

        assert_eq!(store.delete_expired().await.unwrap(), 1);
        assert_eq!(store.len().await, 1);
        assert!(store.find(&SessionId::from("live")).await.unwrap().is_some());
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(generate_session_id(), generate_session_id());
    }

    #[test]
    fn invalid_row_is_reported() {
        let row = SessionRow {
            id: "broken".to_string(),
            data: serde_json::json!({ "id": "broken" }),
        };
        let err = row.try_into_session().unwrap_err();
        assert!(matches!(err, SessionStoreError::InvalidRecord { ref session_id, .. } if session_id == "broken"));
    }
}
