//! SurrealDB implementation of [`SessionRepository`].
//!
//! Rows are addressed by their `session_id` field (unique index) rather
//! than by record ID, because rotation moves a row onto a new session
//! identifier while the record itself stays put.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::session::{RotateSession, SessionRecord, UpsertSession};
use warden_core::models::user::UserId;
use warden_core::repository::SessionRepository;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SessionRowWithId {
    record_id: String,
    session_id: String,
    previous_session_id: Option<String>,
    user_id: i64,
    refresh_hash: String,
    revoked: bool,
    user_agent: String,
    ip_address: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SessionRowWithId {
    fn try_into_session(self) -> Result<SessionRecord, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Row(format!("invalid session UUID: {e}")))?;
        Ok(SessionRecord {
            id,
            session_id: self.session_id,
            previous_session_id: self.previous_session_id,
            user_id: self.user_id,
            refresh_hash: self.refresh_hash,
            revoked: self.revoked,
            user_agent: self.user_agent,
            ip_address: self.ip_address,
            created_at: self.created_at,
            updated_at: self.updated_at,
            expires_at: self.expires_at,
        })
    }
}

/// Only used to learn whether a write touched any row.
#[derive(Debug, SurrealValue)]
struct TouchedRow {
    session_id: String,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// Rotation retries when the engine reports a write conflict but the
/// old identifier is still current.
const ROTATE_ATTEMPTS: u32 = 3;

/// Optimistic-concurrency failure raised when two transactions write the
/// same row. Matched on the error text.
fn is_write_conflict(err: &DbError) -> bool {
    let message = err.to_string().to_ascii_lowercase();
    message.contains("transaction conflict") || message.contains("write conflict")
}

fn not_found(session_id: &str) -> DbError {
    DbError::NotFound {
        entity: "session".into(),
        id: session_id.to_string(),
    }
}

/// SurrealDB implementation of the session store.
#[derive(Clone)]
pub struct SurrealSessionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSessionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn get_current(&self, session_id: &str) -> Result<Option<SessionRecord>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM session \
                 WHERE session_id = $session_id",
            )
            .bind(("session_id", session_id.to_string()))
            .await?;

        let rows: Vec<SessionRowWithId> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(SessionRowWithId::try_into_session)
            .transpose()
    }

    /// One conditional UPDATE. The row-level write is atomic, so of two
    /// racing rotations at most one can match the old identifier. Returns
    /// whether a row was moved.
    async fn try_rotate(&self, input: &RotateSession) -> Result<bool, DbError> {
        let result = self
            .db
            .query(
                "UPDATE session SET \
                 session_id = $new_session_id, \
                 previous_session_id = $old_session_id, \
                 refresh_hash = $refresh_hash, \
                 ip_address = $ip_address, \
                 updated_at = time::now() \
                 WHERE session_id = $old_session_id",
            )
            .bind(("old_session_id", input.old_session_id.clone()))
            .bind(("new_session_id", input.new_session_id.clone()))
            .bind(("refresh_hash", input.new_refresh_hash.clone()))
            .bind(("ip_address", input.new_ip_address.clone()))
            .await?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let touched: Vec<TouchedRow> = result.take(0)?;
        Ok(!touched.is_empty())
    }
}

impl<C: Connection> SessionRepository for SurrealSessionRepository<C> {
    async fn get(&self, session_id: &str) -> WardenResult<SessionRecord> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM session \
                 WHERE session_id = $session_id \
                 OR previous_session_id = $session_id",
            )
            .bind(("session_id", session_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRowWithId> = result.take(0).map_err(DbError::from)?;
        let mut sessions = rows
            .into_iter()
            .map(SessionRowWithId::try_into_session)
            .collect::<Result<Vec<_>, DbError>>()?;

        // A current-identifier match outranks a previous-identifier match.
        sessions.sort_by_key(|s| s.session_id != session_id);
        sessions
            .into_iter()
            .next()
            .ok_or_else(|| not_found(session_id).into())
    }

    async fn upsert(&self, input: UpsertSession) -> WardenResult<SessionRecord> {
        let session_id = input.session_id.clone();

        // Overwrite in place and clear the revoked flag when the identifier
        // exists (the owning user is left as-is), insert otherwise. Both
        // branches run in one transaction.
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 LET $hit = (UPDATE session SET \
                     refresh_hash = $refresh_hash, \
                     revoked = false, \
                     user_agent = $user_agent, \
                     ip_address = $ip_address, \
                     expires_at = $expires_at, \
                     updated_at = time::now() \
                     WHERE session_id = $session_id \
                     RETURN session_id); \
                 IF array::len($hit) == 0 { \
                     CREATE type::record('session', $id) SET \
                         session_id = $session_id, \
                         previous_session_id = NONE, \
                         user_id = $user_id, \
                         refresh_hash = $refresh_hash, \
                         revoked = false, \
                         user_agent = $user_agent, \
                         ip_address = $ip_address, \
                         expires_at = $expires_at; \
                 }; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", Uuid::new_v4().to_string()))
            .bind(("session_id", session_id.clone()))
            .bind(("user_id", input.user_id))
            .bind(("refresh_hash", input.refresh_hash))
            .bind(("user_agent", input.user_agent))
            .bind(("ip_address", input.ip_address))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let session = self
            .get_current(&session_id)
            .await?
            .ok_or_else(|| not_found(&session_id))?;
        debug!(%session_id, row = %session.id, "Session upserted");
        Ok(session)
    }

    async fn rotate(&self, input: RotateSession) -> WardenResult<()> {
        for attempt in 1..=ROTATE_ATTEMPTS {
            match self.try_rotate(&input).await {
                Ok(true) => return Ok(()),
                Ok(false) => return Err(not_found(&input.old_session_id).into()),
                Err(e) if is_write_conflict(&e) => {
                    // The conflicting writer has committed. If it moved the
                    // session off the old identifier, this rotation lost.
                    if self.get_current(&input.old_session_id).await?.is_none() {
                        debug!(
                            old_session_id = %input.old_session_id,
                            "Rotation lost a write conflict"
                        );
                        return Err(not_found(&input.old_session_id).into());
                    }
                    debug!(attempt, "Write conflict on session rotation, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(DbError::Query(format!(
            "session {} still conflicting after {ROTATE_ATTEMPTS} attempts",
            input.old_session_id
        ))
        .into())
    }

    async fn revoke(&self, session_id: &str) -> WardenResult<()> {
        let mut result = self
            .db
            .query(
                "UPDATE session SET revoked = true, updated_at = time::now() \
                 WHERE session_id = $session_id",
            )
            .bind(("session_id", session_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let touched: Vec<TouchedRow> = result.take(0).map_err(DbError::from)?;
        if touched.is_empty() {
            return Err(not_found(session_id).into());
        }
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> WardenResult<()> {
        let mut result = self
            .db
            .query("DELETE session WHERE session_id = $session_id RETURN BEFORE")
            .bind(("session_id", session_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let touched: Vec<TouchedRow> = result.take(0).map_err(DbError::from)?;
        if touched.is_empty() {
            return Err(not_found(session_id).into());
        }
        Ok(())
    }

    async fn revoke_user_sessions(&self, user_id: UserId) -> WardenResult<()> {
        self.db
            .query(
                "UPDATE session SET revoked = true, updated_at = time::now() \
                 WHERE user_id = $user_id",
            )
            .bind(("user_id", user_id))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn has_active_session(&self, user_id: UserId) -> WardenResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM session \
                 WHERE user_id = $user_id AND revoked = false \
                 AND expires_at > time::now() GROUP ALL",
            )
            .bind(("user_id", user_id))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn cleanup_expired(&self) -> WardenResult<u64> {
        let mut result = self
            .db
            .query("DELETE session WHERE expires_at <= time::now() RETURN BEFORE")
            .await
            .map_err(DbError::from)?;

        let removed: Vec<TouchedRow> = result.take(0).map_err(DbError::from)?;
        Ok(removed.len() as u64)
    }
}
