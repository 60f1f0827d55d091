//! # Password Hashing
//!
//! Salted argon2id hashes in PHC string format
//! (`$argon2id$v=19$m=19456,t=2,p=1$<salt>$<hash>`). Verification goes through
//! `PasswordVerifier`, which compares in constant time.

use std::sync::OnceLock;

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};

use crate::error::{DbError, DbResult};

/// Hashes a password for storage.
pub fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::PasswordHash(e.to_string()))?;

    Ok(hash.to_string())
}

/// Checks a password against a stored hash. A malformed hash never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

static DUMMY_HASH: OnceLock<String> = OnceLock::new();

/// Runs a full verification against a throwaway hash and returns false.
///
/// Used when no account matches a username, so that the failure takes as
/// long as a wrong password for a real account.
pub fn verify_unknown_user(password: &str) -> bool {
    let hash = DUMMY_HASH.get_or_init(|| {
        hash_password("invpro-unknown-user").unwrap_or_else(|e| {
            tracing::error!("Dummy password hash failed: {}", e);
            String::new()
        })
    });
    verify_password(password, hash);
    false
}
