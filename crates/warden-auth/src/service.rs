//! Session lifecycle engine: registration, login, stateless request
//! authentication, refresh rotation, revocation and logout.
//!
//! The engine holds no mutable state of its own. Everything durable goes
//! through the [`UserRepository`] and [`SessionRepository`] it is built
//! with; the IP-change notifier is the only other side effect.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use warden_core::error::WardenError;
use warden_core::models::session::{DeviceInfo, RotateSession, UpsertSession};
use warden_core::models::user::{CreateUser, User, UserId};
use warden_core::repository::{SessionRepository, UserRepository};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::notify::{HttpIpChangeNotifier, IpChangeNotice, IpChangeNotifier, LogIpChangeNotifier};
use crate::password;
use crate::refresh;
use crate::token::{AccessClaims, ClaimsCodec};

/// Input for the sign-up flow.
#[derive(Debug)]
pub struct RegisterInput {
    pub name: String,
    pub username: String,
    pub password: String,
}

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
    pub device: DeviceInfo,
}

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    /// Session identifier (the access token's `jti`).
    pub session_id: String,
    /// Signed JWT access token.
    pub access_token: String,
    /// Claims of `access_token`, for TTL reporting.
    pub access_claims: AccessClaims,
    /// Raw opaque refresh token (return to client, not stored).
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
    pub user_id: UserId,
    pub username: String,
}

/// Input for the refresh rotation flow.
#[derive(Debug)]
pub struct RotateInput {
    /// Refresh token handed out with the access token being rotated.
    pub refresh_token: String,
    pub device: DeviceInfo,
}

/// Successful rotation result (new token pair).
#[derive(Debug)]
pub struct RotateOutput {
    /// New session identifier.
    pub session_id: String,
    pub access_token: String,
    pub access_claims: AccessClaims,
    /// New refresh token; the submitted one is now dead.
    pub refresh_token: String,
    /// Absolute session expiry. Rotation does not extend it.
    pub refresh_expires_at: DateTime<Utc>,
}

/// Map a session-store failure, turning `NotFound` into
/// [`AuthError::SessionNotFound`].
fn session_error(err: WardenError) -> AuthError {
    if err.is_not_found() {
        AuthError::SessionNotFound
    } else {
        AuthError::Persistence(err)
    }
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the database crate.
pub struct AuthService<U: UserRepository, S: SessionRepository> {
    user_repo: U,
    session_repo: S,
    codec: ClaimsCodec,
    notifier: Arc<dyn IpChangeNotifier>,
    config: AuthConfig,
}

impl<U: UserRepository, S: SessionRepository> AuthService<U, S> {
    /// Build the engine. Fails with [`AuthError::Signing`] when the
    /// signing secret is empty and with [`AuthError::Validation`] when a
    /// token lifetime is out of range.
    ///
    /// IP-change notices go to `config.ip_change_notify_url` when set and
    /// are only logged otherwise.
    pub fn new(user_repo: U, session_repo: S, config: AuthConfig) -> Result<Self, AuthError> {
        config.validate()?;
        let codec = ClaimsCodec::new(&config.signing_secret)?;
        let notifier: Arc<dyn IpChangeNotifier> = match &config.ip_change_notify_url {
            Some(url) => Arc::new(HttpIpChangeNotifier::new(
                url.clone(),
                Duration::from_secs(config.notify_timeout_secs),
            )?),
            None => Arc::new(LogIpChangeNotifier),
        };

        Ok(Self {
            user_repo,
            session_repo,
            codec,
            notifier,
            config,
        })
    }

    /// Replace the IP-change notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn IpChangeNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn codec(&self) -> &ClaimsCodec {
        &self.codec
    }

    /// Create a user account.
    pub async fn register(&self, input: RegisterInput) -> Result<User, AuthError> {
        if input.name.trim().is_empty()
            || input.username.trim().is_empty()
            || input.password.is_empty()
        {
            return Err(AuthError::Validation("all fields are required".into()));
        }

        if self.user_repo.username_exists(&input.username).await? {
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = password::hash_password(&input.password, self.config.pepper.as_deref())?;
        let user = self
            .user_repo
            .create(CreateUser {
                name: input.name,
                username: input.username,
                password_hash,
            })
            .await?;

        info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Authenticate a user with username + password and open a session
    /// bound to the requesting device.
    pub async fn login(&self, input: LoginInput) -> Result<LoginOutput, AuthError> {
        if input.username.is_empty() || input.password.is_empty() {
            return Err(AuthError::Validation("all fields are required".into()));
        }

        // 1. Resolve identity. Unknown users and bad passwords look the same.
        let user = match self.user_repo.get_by_username(&input.username).await {
            Ok(u) => u,
            Err(e) if e.is_not_found() => return Err(AuthError::InvalidCredentials),
            Err(e) => return Err(e.into()),
        };

        // 2. Verify password.
        let valid = password::verify_password(
            &input.password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            warn!(user_id = user.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        // 3. Mint the pair.
        let (access_token, access_claims) =
            self.codec
                .issue(user.id, &user.username, self.config.access_token_ttl())?;
        let refresh_token = refresh::generate()?;
        let refresh_hash = refresh::hash(&refresh_token)?;
        let refresh_expires_at = Utc::now()
            .checked_add_signed(self.config.refresh_token_ttl())
            .ok_or_else(|| AuthError::Validation("refresh token lifetime out of range".into()))?;

        // 4. Persist the session under the access token's jti. Only the
        //    refresh hash is stored.
        let session = self
            .session_repo
            .upsert(UpsertSession {
                session_id: access_claims.jti.clone(),
                user_id: user.id,
                refresh_hash,
                user_agent: input.device.user_agent,
                ip_address: input.device.ip_address,
                expires_at: refresh_expires_at,
            })
            .await?;

        info!(
            user_id = user.id,
            session_id = %session.session_id,
            "Login succeeded"
        );

        Ok(LoginOutput {
            session_id: session.session_id,
            access_token,
            access_claims,
            refresh_token,
            refresh_expires_at,
            user_id: user.id,
            username: user.username,
        })
    }

    /// Authenticate a request by its access token.
    ///
    /// Purely stateless: no session lookup happens here, so a revoked
    /// session's access token keeps working until it expires. The short
    /// access-token lifetime bounds that window.
    pub fn authenticate(&self, access_token: &str) -> Result<AccessClaims, AuthError> {
        self.codec
            .verify(access_token)
            .map_err(|e| AuthError::Unauthenticated(Box::new(e)))
    }

    /// Read the claims of an access token presented for rotation. The
    /// signature must hold; expiry is not checked.
    pub fn claims_for_rotation(&self, access_token: &str) -> Result<AccessClaims, AuthError> {
        self.codec
            .verify_allow_expired(access_token)
            .map_err(|e| AuthError::Unauthenticated(Box::new(e)))
    }

    /// Load the user an access token was issued to.
    pub async fn current_user(&self, claims: &AccessClaims) -> Result<User, AuthError> {
        Ok(self.user_repo.get_by_id(claims.user_id()).await?)
    }

    /// Exchange the current access/refresh pair for a new one.
    ///
    /// The refresh secret is checked before any device signal, so a
    /// caller without the secret never learns whether the user agent or
    /// the IP would have tripped.
    pub async fn rotate(
        &self,
        claims: &AccessClaims,
        input: RotateInput,
    ) -> Result<RotateOutput, AuthError> {
        // 1. Session lookup (current or just-replaced identifier).
        let session = self
            .session_repo
            .get(claims.session_id())
            .await
            .map_err(session_error)?;

        // 2. Refresh secret. A replayed secret fails here because the
        //    stored hash changes on every rotation.
        if let Err(e) = refresh::matches(&input.refresh_token, &session.refresh_hash) {
            warn!(
                user_id = session.user_id,
                session_id = %claims.jti,
                "Rotation rejected: refresh token mismatch"
            );
            return Err(e);
        }

        // 3. User agent. A valid secret from a different device means the
        //    pair leaked; the session is withdrawn for good.
        if input.device.user_agent != session.user_agent {
            warn!(
                user_id = session.user_id,
                session_id = %session.session_id,
                stored = %session.user_agent,
                presented = %input.device.user_agent,
                "Rotation rejected: user agent mismatch, revoking session"
            );
            self.session_repo
                .revoke(&session.session_id)
                .await
                .map_err(session_error)?;
            return Err(AuthError::DeviceMismatch);
        }

        // 4. IP. Advisory only.
        if input.device.ip_address != session.ip_address {
            warn!(
                user_id = session.user_id,
                old_ip = %session.ip_address,
                new_ip = %input.device.ip_address,
                "Session rotated from a new IP address"
            );
            self.notifier.notify(IpChangeNotice {
                user_id: session.user_id,
                old_ip: session.ip_address.clone(),
                new_ip: input.device.ip_address.clone(),
            });
        }

        // 5. Revocation.
        if session.revoked {
            return Err(AuthError::SessionRevoked);
        }

        // 6. Ownership.
        if session.user_id != claims.user_id() {
            warn!(
                session_user = session.user_id,
                token_user = claims.user_id(),
                "Rotation rejected: session belongs to another user"
            );
            return Err(AuthError::SessionUserMismatch);
        }

        if session.is_expired_at(Utc::now()) {
            return Err(AuthError::SessionExpired);
        }

        // Only the current access token may rotate its session.
        if session.session_id != claims.jti {
            return Err(AuthError::SessionNotFound);
        }

        // 7. Mint and swap atomically.
        let (access_token, access_claims) =
            self.codec
                .issue(claims.user_id(), &claims.username, self.config.access_token_ttl())?;
        let refresh_token = refresh::generate()?;
        let new_refresh_hash = refresh::hash(&refresh_token)?;

        self.session_repo
            .rotate(RotateSession {
                old_session_id: claims.jti.clone(),
                new_session_id: access_claims.jti.clone(),
                new_refresh_hash,
                new_ip_address: input.device.ip_address,
            })
            .await
            .map_err(session_error)?;

        info!(
            user_id = session.user_id,
            old_session_id = %claims.jti,
            new_session_id = %access_claims.jti,
            "Session rotated"
        );

        Ok(RotateOutput {
            session_id: access_claims.jti.clone(),
            access_token,
            access_claims,
            refresh_token,
            refresh_expires_at: session.expires_at,
        })
    }

    /// Revoke the session behind an access token. Further rotations fail
    /// with [`AuthError::SessionRevoked`]; the access token itself stays
    /// valid until it expires.
    pub async fn revoke(&self, claims: &AccessClaims) -> Result<(), AuthError> {
        self.session_repo
            .revoke(claims.session_id())
            .await
            .map_err(session_error)?;
        info!(user_id = claims.user_id(), session_id = %claims.jti, "Session revoked");
        Ok(())
    }

    /// Delete the session behind an access token.
    pub async fn logout(&self, claims: &AccessClaims) -> Result<(), AuthError> {
        self.session_repo
            .delete(claims.session_id())
            .await
            .map_err(session_error)?;
        info!(user_id = claims.user_id(), session_id = %claims.jti, "Logged out");
        Ok(())
    }

    /// Revoke every session a user owns (e.g. on password change).
    pub async fn revoke_all_sessions(&self, user_id: UserId) -> Result<(), AuthError> {
        self.session_repo.revoke_user_sessions(user_id).await?;
        info!(user_id, "All sessions revoked");
        Ok(())
    }

    /// Whether the user has at least one live session.
    pub async fn has_active_session(&self, user_id: UserId) -> Result<bool, AuthError> {
        Ok(self.session_repo.has_active_session(user_id).await?)
    }

    /// Delete sessions past their expiry. Returns how many were removed.
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, AuthError> {
        let removed = self.session_repo.cleanup_expired().await?;
        debug!(removed, "Expired sessions cleaned up");
        Ok(removed)
    }
}
