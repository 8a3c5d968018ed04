//! Opaque refresh secrets: generation from the OS CSPRNG and Argon2id
//! hashing for at-rest storage.

use argon2::password_hash::rand_core::OsRng as SaltRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::error::AuthError;

/// Bytes of entropy in a refresh secret.
pub const REFRESH_SECRET_BYTES: usize = 32;

// Argon2id cost: m = 19 MiB, t = 2, p = 1. Every stored refresh hash
// is produced with these parameters.
const HASH_MEMORY_KIB: u32 = 19_456;
const HASH_ITERATIONS: u32 = 2;
const HASH_PARALLELISM: u32 = 1;

fn hasher() -> Result<Argon2<'static>, AuthError> {
    let params = Params::new(HASH_MEMORY_KIB, HASH_ITERATIONS, HASH_PARALLELISM, None)
        .map_err(|e| AuthError::Hashing(format!("argon2 params: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Generate a refresh secret: 32 bytes from the OS random source,
/// base64url-encoded without padding (43 chars).
pub fn generate() -> Result<String, AuthError> {
    let mut bytes = [0u8; REFRESH_SECRET_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::Entropy(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Salted one-way hash of a refresh secret (Argon2id PHC string).
pub fn hash(secret: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut SaltRng);
    hasher()?
        .hash_password(secret.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hashing(format!("refresh hash: {e}")))
}

/// Check a candidate secret against a stored hash.
///
/// Any failure, including a malformed stored hash, is
/// [`AuthError::RefreshMismatch`].
pub fn matches(candidate: &str, hashed: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(hashed).map_err(|_| AuthError::RefreshMismatch)?;
    // Parameters are read from the PHC string; the verifier's own
    // defaults do not matter here.
    Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .map_err(|_| AuthError::RefreshMismatch)
}
