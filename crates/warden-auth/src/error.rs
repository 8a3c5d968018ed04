//! Authentication error types.

use thiserror::Error;
use warden_core::error::WardenError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("token has expired")]
    Expired,

    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    #[error("hashing failed: {0}")]
    Hashing(String),

    #[error("refresh token does not match")]
    RefreshMismatch,

    #[error("user agent does not match")]
    DeviceMismatch,

    #[error("session revoked")]
    SessionRevoked,

    #[error("session not found")]
    SessionNotFound,

    #[error("session belongs to another user")]
    SessionUserMismatch,

    #[error("session has expired")]
    SessionExpired,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("username is already taken")]
    UsernameTaken,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unauthenticated: {0}")]
    Unauthenticated(Box<AuthError>),

    #[error("persistence error: {0}")]
    Persistence(#[from] WardenError),
}

impl From<AuthError> for WardenError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Persistence(inner) => inner,
            AuthError::Signing(msg) | AuthError::Entropy(msg) | AuthError::Hashing(msg) => {
                WardenError::Crypto(msg)
            }
            AuthError::Validation(message) => WardenError::Validation { message },
            AuthError::UsernameTaken => WardenError::AlreadyExists {
                entity: "user".into(),
            },
            other => WardenError::AuthenticationFailed {
                reason: other.to_string(),
            },
        }
    }
}
