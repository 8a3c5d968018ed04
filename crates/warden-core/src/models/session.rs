//! Session domain model.
//!
//! A session binds the `jti` of the most recently issued access token to
//! the hash of the refresh secret handed out with it, plus the device the
//! pair was issued to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserId;

/// User agent recorded when the client sends none.
pub const UNKNOWN_USER_AGENT: &str = "unknown";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRecord {
    /// Row identifier, assigned by the store on insert.
    pub id: Uuid,
    /// `jti` of the current access token.
    pub session_id: String,
    /// `jti` replaced by the last rotation, if any.
    pub previous_session_id: Option<String>,
    pub user_id: UserId,
    /// Argon2id PHC hash of the refresh secret. Never the secret itself.
    pub refresh_hash: String,
    pub revoked: bool,
    pub user_agent: String,
    pub ip_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Insert-or-overwrite payload keyed by `session_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertSession {
    pub session_id: String,
    pub user_id: UserId,
    pub refresh_hash: String,
    pub user_agent: String,
    pub ip_address: String,
    pub expires_at: DateTime<Utc>,
}

/// Atomic rotation of a session onto a new identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotateSession {
    pub old_session_id: String,
    pub new_session_id: String,
    pub new_refresh_hash: String,
    pub new_ip_address: String,
}

/// The device a request originates from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceInfo {
    pub user_agent: String,
    pub ip_address: String,
}

impl DeviceInfo {
    /// Build device info from raw request values. A blank user agent is
    /// recorded as [`UNKNOWN_USER_AGENT`].
    pub fn new(user_agent: impl Into<String>, ip_address: impl Into<String>) -> Self {
        let user_agent = user_agent.into();
        let user_agent = if user_agent.trim().is_empty() {
            UNKNOWN_USER_AGENT.to_string()
        } else {
            user_agent
        };
        Self {
            user_agent,
            ip_address: ip_address.into(),
        }
    }
}
