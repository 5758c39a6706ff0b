//! Account secret hashing.
//!
//! An explicit hash/verify pair invoked by the credential operations,
//! so the hashing step is visible and independently testable. Secrets
//! are salted argon2id hashes; comparison happens inside argon2's
//! constant-time verifier, never against plaintext.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

use crate::error::CoreError;

/// Hash a plaintext secret with a fresh random salt.
pub fn hash_secret(plaintext: &str) -> Result<String, CoreError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| CoreError::Hash)
}

/// Verify a plaintext secret against a stored hash.
///
/// An unparseable stored hash verifies as false rather than erroring;
/// the caller only ever learns match / no-match.
pub fn verify_secret(plaintext: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_secret("correct horse battery staple").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_secret("correct horse battery staple", &hash));
        assert!(!verify_secret("wrong secret", &hash));
    }

    #[test]
    fn salts_are_unique() {
        let a = hash_secret("same secret").unwrap();
        let b = hash_secret("same secret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_secret("anything", "not-a-hash"));
    }
}
