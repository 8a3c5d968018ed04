//! Authentication configuration.

use chrono::Duration;

use crate::error::AuthError;

/// Upper bound for either token lifetime (ten years).
pub const MAX_LIFETIME_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Configuration for the authentication service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Symmetric HS512 signing secret. Must be non-empty.
    pub signing_secret: String,
    /// Access token lifetime in seconds (default: 900 = 15 minutes).
    pub access_token_lifetime_secs: u64,
    /// Refresh token lifetime in seconds (default: 604_800 = 7 days).
    pub refresh_token_lifetime_secs: u64,
    /// Optional pepper prepended to passwords before Argon2id hashing.
    pub pepper: Option<String>,
    /// Endpoint receiving IP-change notifications. `None` logs them only.
    pub ip_change_notify_url: Option<String>,
    /// Timeout for a single notification request (default: 30 seconds).
    pub notify_timeout_secs: u64,
}

impl AuthConfig {
    /// Reject lifetimes that are zero or above [`MAX_LIFETIME_SECS`].
    pub fn validate(&self) -> Result<(), AuthError> {
        check_lifetime("access_token_lifetime_secs", self.access_token_lifetime_secs)?;
        check_lifetime("refresh_token_lifetime_secs", self.refresh_token_lifetime_secs)
    }

    pub fn access_token_ttl(&self) -> Duration {
        lifetime(self.access_token_lifetime_secs)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        lifetime(self.refresh_token_lifetime_secs)
    }
}

fn check_lifetime(field: &str, secs: u64) -> Result<(), AuthError> {
    if secs == 0 || secs > MAX_LIFETIME_SECS {
        return Err(AuthError::Validation(format!(
            "{field} must be between 1 and {MAX_LIFETIME_SECS}, got {secs}"
        )));
    }
    Ok(())
}

// Saturates instead of panicking; `validate` keeps real values far below.
fn lifetime(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signing_secret: String::new(),
            access_token_lifetime_secs: 900,
            refresh_token_lifetime_secs: 604_800,
            pepper: None,
            ip_change_notify_url: None,
            notify_timeout_secs: 30,
        }
    }
}
