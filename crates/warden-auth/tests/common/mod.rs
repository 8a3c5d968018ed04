//! In-memory repositories and a recording notifier shared by the
//! integration tests.
//!
//! The session store yields to the scheduler between reading a record and
//! handing it back, so two rotations driven by `tokio::join!` interleave
//! at the same point every run.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;
use warden_auth::config::AuthConfig;
use warden_auth::notify::{IpChangeNotice, IpChangeNotifier};
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::session::{RotateSession, SessionRecord, UpsertSession};
use warden_core::models::user::{CreateUser, User, UserId};
use warden_core::repository::{SessionRepository, UserRepository};

pub const TEST_SECRET: &str = "warden-test-signing-secret-0123456789";

pub fn test_config() -> AuthConfig {
    AuthConfig {
        signing_secret: TEST_SECRET.into(),
        ..AuthConfig::default()
    }
}

fn not_found(entity: &str, id: impl ToString) -> WardenError {
    WardenError::NotFound {
        entity: entity.into(),
        id: id.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MemoryUserRepository {
    users: Arc<Mutex<Vec<User>>>,
}

impl UserRepository for MemoryUserRepository {
    async fn create(&self, input: CreateUser) -> WardenResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.username == input.username) {
            return Err(WardenError::AlreadyExists {
                entity: "user".into(),
            });
        }
        let user = User {
            id: users.len() as UserId + 1,
            name: input.name,
            username: input.username,
            password_hash: input.password_hash,
            created_at: Utc::now(),
            updated_at: None,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: UserId) -> WardenResult<User> {
        let users = self.users.lock().unwrap();
        users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| not_found("user", id))
    }

    async fn get_by_username(&self, username: &str) -> WardenResult<User> {
        let users = self.users.lock().unwrap();
        users
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| not_found("user", username))
    }

    async fn username_exists(&self, username: &str) -> WardenResult<bool> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().any(|u| u.username == username))
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MemorySessionRepository {
    sessions: Arc<Mutex<Vec<SessionRecord>>>,
}

impl MemorySessionRepository {
    pub fn snapshot(&self) -> Vec<SessionRecord> {
        self.sessions.lock().unwrap().clone()
    }
}

impl SessionRepository for MemorySessionRepository {
    async fn get(&self, session_id: &str) -> WardenResult<SessionRecord> {
        let found = {
            let sessions = self.sessions.lock().unwrap();
            sessions
                .iter()
                .find(|s| s.session_id == session_id)
                .or_else(|| {
                    sessions
                        .iter()
                        .find(|s| s.previous_session_id.as_deref() == Some(session_id))
                })
                .cloned()
        };
        tokio::task::yield_now().await;
        found.ok_or_else(|| not_found("session", session_id))
    }

    async fn upsert(&self, input: UpsertSession) -> WardenResult<SessionRecord> {
        let mut sessions = self.sessions.lock().unwrap();
        let now = Utc::now();
        if let Some(existing) = sessions
            .iter_mut()
            .find(|s| s.session_id == input.session_id)
        {
            existing.refresh_hash = input.refresh_hash;
            existing.user_agent = input.user_agent;
            existing.ip_address = input.ip_address;
            existing.expires_at = input.expires_at;
            existing.revoked = false;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let record = SessionRecord {
            id: Uuid::new_v4(),
            session_id: input.session_id,
            previous_session_id: None,
            user_id: input.user_id,
            refresh_hash: input.refresh_hash,
            revoked: false,
            user_agent: input.user_agent,
            ip_address: input.ip_address,
            created_at: now,
            updated_at: now,
            expires_at: input.expires_at,
        };
        sessions.push(record.clone());
        Ok(record)
    }

    async fn rotate(&self, input: RotateSession) -> WardenResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        let record = sessions
            .iter_mut()
            .find(|s| s.session_id == input.old_session_id)
            .ok_or_else(|| not_found("session", &input.old_session_id))?;
        record.previous_session_id = Some(std::mem::replace(
            &mut record.session_id,
            input.new_session_id,
        ));
        record.refresh_hash = input.new_refresh_hash;
        record.ip_address = input.new_ip_address;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn revoke(&self, session_id: &str) -> WardenResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        let record = sessions
            .iter_mut()
            .find(|s| s.session_id == session_id)
            .ok_or_else(|| not_found("session", session_id))?;
        record.revoked = true;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> WardenResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|s| s.session_id != session_id);
        if sessions.len() == before {
            return Err(not_found("session", session_id));
        }
        Ok(())
    }

    async fn revoke_user_sessions(&self, user_id: UserId) -> WardenResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        for s in sessions.iter_mut().filter(|s| s.user_id == user_id) {
            s.revoked = true;
        }
        Ok(())
    }

    async fn has_active_session(&self, user_id: UserId) -> WardenResult<bool> {
        let sessions = self.sessions.lock().unwrap();
        let now = Utc::now();
        Ok(sessions
            .iter()
            .any(|s| s.user_id == user_id && !s.revoked && !s.is_expired_at(now)))
    }

    async fn cleanup_expired(&self) -> WardenResult<u64> {
        let mut sessions = self.sessions.lock().unwrap();
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|s| !s.is_expired_at(now));
        Ok((before - sessions.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<IpChangeNotice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<IpChangeNotice> {
        self.notices.lock().unwrap().clone()
    }
}

impl IpChangeNotifier for RecordingNotifier {
    fn notify(&self, notice: IpChangeNotice) {
        self.notices.lock().unwrap().push(notice);
    }
}
