//! Password hashing at the storage boundary.
//!
//! Passwords are hashed with Argon2id before they ever reach the
//! primary store; nothing downstream of this module sees plaintext.
//! Credential fields are additionally excluded from every mirror
//! whitelist, so not even the hash leaves the primary store.

use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};

use crate::error::AuthError;

/// Hashes a password with a fresh random salt.
///
/// # Errors
///
/// * `AuthError::CredentialHash` - If hashing fails
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::CredentialHash {
            message: e.to_string(),
        })?;
    Ok(hash.to_string())
}

/// Verifies a password against a stored hash.
///
/// A malformed stored hash verifies as `false` rather than erroring;
/// login paths treat it the same as a wrong password.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
