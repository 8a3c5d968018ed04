//! HS512 JWT access token issuance and verification.
//!
//! The codec owns the signing secret and a fixed [`Validation`]: the only
//! accepted algorithm is HS512, whatever the token header claims, which
//! closes off algorithm-confusion tricks.

use std::fmt;
use std::sync::Once;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_core::models::user::UserId;

use crate::error::AuthError;

const ALGORITHM: Algorithm = Algorithm::HS512;

static CRYPTO_PROVIDER: Once = Once::new();

/// Pin the process-wide jsonwebtoken backend. Other crates in the build
/// (the SurrealDB client among them) switch on a second backend, and with
/// two compiled in jsonwebtoken refuses to choose on its own.
fn install_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        // Err: a provider is already installed.
        let _ = jsonwebtoken::crypto::rust_crypto::DEFAULT_PROVIDER.install_default();
    });
}

/// JWT claims embedded in every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: user ID, carried as a decimal string on the wire.
    #[serde(with = "subject")]
    pub sub: UserId,
    pub username: String,
    /// Unique token ID; doubles as the session identifier.
    pub jti: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

impl AccessClaims {
    pub fn user_id(&self) -> UserId {
        self.sub
    }

    pub fn session_id(&self) -> &str {
        &self.jti
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }
}

mod subject {
    use serde::{Deserialize, Deserializer, Serializer};
    use warden_core::models::user::UserId;

    pub fn serialize<S: Serializer>(id: &UserId, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<UserId, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Signs and verifies access tokens with a single symmetric secret.
#[derive(Clone)]
pub struct ClaimsCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    strict: Validation,
    allow_expired: Validation,
}

impl fmt::Debug for ClaimsCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimsCodec")
            .field("algorithm", &ALGORITHM)
            .finish_non_exhaustive()
    }
}

impl ClaimsCodec {
    /// Build a codec. Fails with [`AuthError::Signing`] on an empty secret.
    pub fn new(secret: &str) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Signing("signing secret is empty".into()));
        }
        install_crypto_provider();

        let mut strict = Validation::new(ALGORITHM);
        strict.leeway = 0;
        strict.set_required_spec_claims(&["exp", "sub"]);

        let mut allow_expired = strict.clone();
        allow_expired.validate_exp = false;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            strict,
            allow_expired,
        })
    }

    /// Issue a signed access token valid for `ttl` from now.
    pub fn issue(
        &self,
        user_id: UserId,
        username: &str,
        ttl: Duration,
    ) -> Result<(String, AccessClaims), AuthError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::Signing(format!("token lifetime out of range: {ttl}")))?;
        let claims = AccessClaims {
            sub: user_id,
            username: username.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let token = jsonwebtoken::encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(format!("JWT encode: {e}")))?;

        Ok((token, claims))
    }

    /// Verify signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, AuthError> {
        self.decode(token, &self.strict)
    }

    /// Verify the signature only. Used to read the claims of an access
    /// token that is being rotated, which has usually just lapsed.
    pub fn verify_allow_expired(&self, token: &str) -> Result<AccessClaims, AuthError> {
        self.decode(token, &self.allow_expired)
    }

    fn decode(&self, token: &str, validation: &Validation) -> Result<AccessClaims, AuthError> {
        jsonwebtoken::decode::<AccessClaims>(token, &self.decoding, validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    AuthError::InvalidSignature
                }
                _ => AuthError::MalformedToken(e.to_string()),
            })
    }
}
