//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Implementations live in
//! `warden-db`; the auth engine only ever sees these traits.

use crate::error::WardenResult;
use crate::models::{
    session::{RotateSession, SessionRecord, UpsertSession},
    user::{CreateUser, User, UserId},
};

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = WardenResult<User>> + Send;
    fn get_by_id(&self, id: UserId) -> impl Future<Output = WardenResult<User>> + Send;
    fn get_by_username(&self, username: &str) -> impl Future<Output = WardenResult<User>> + Send;
    fn username_exists(&self, username: &str) -> impl Future<Output = WardenResult<bool>> + Send;
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

pub trait SessionRepository: Send + Sync {
    /// Fetch a session by identifier. A record whose current identifier
    /// matches wins over one whose previous identifier matches.
    fn get(&self, session_id: &str) -> impl Future<Output = WardenResult<SessionRecord>> + Send;
    /// Insert a session, or overwrite the one with the same identifier
    /// and clear its revoked flag.
    fn upsert(&self, input: UpsertSession)
    -> impl Future<Output = WardenResult<SessionRecord>> + Send;
    /// Move a session onto a new identifier, hash and IP in one atomic
    /// step. `NotFound` when `old_session_id` is no longer current.
    fn rotate(&self, input: RotateSession) -> impl Future<Output = WardenResult<()>> + Send;
    /// Flag a session as revoked.
    fn revoke(&self, session_id: &str) -> impl Future<Output = WardenResult<()>> + Send;
    /// Remove a session outright.
    fn delete(&self, session_id: &str) -> impl Future<Output = WardenResult<()>> + Send;
    /// Flag every session of a user as revoked.
    fn revoke_user_sessions(&self, user_id: UserId)
    -> impl Future<Output = WardenResult<()>> + Send;
    /// Whether the user owns a non-revoked, unexpired session.
    fn has_active_session(&self, user_id: UserId)
    -> impl Future<Output = WardenResult<bool>> + Send;
    /// Remove all expired sessions.
    fn cleanup_expired(&self) -> impl Future<Output = WardenResult<u64>> + Send;
}
