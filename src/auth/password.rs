//! Salted one-way password hashing.
//!
//! Hashes are Argon2id PHC strings, so the salt and cost parameters travel
//! with the hash and `verify` needs nothing else.

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use thiserror::Error;

/// Longest plaintext accepted, in bytes.
pub const MAX_PASSWORD_BYTES: usize = 1024;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("password exceeds {MAX_PASSWORD_BYTES} bytes")]
    TooLong,
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// One-way transform with a per-call random salt.
pub trait PasswordHasher: Send + Sync {
    /// Hash `plaintext` with a fresh salt.
    ///
    /// # Errors
    /// Returns [`HashError::TooLong`] for input over [`MAX_PASSWORD_BYTES`].
    fn hash(&self, plaintext: &str) -> Result<String, HashError>;

    /// Check `plaintext` against a hash produced by [`PasswordHasher::hash`].
    fn verify(&self, hash: &str, plaintext: &str) -> bool;
}

#[derive(Clone, Debug)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    #[must_use]
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Err(HashError::TooLong);
        }

        let salt = SaltString::generate(&mut OsRng);

        self.argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| HashError::Hash(e.to_string()))
    }

    fn verify(&self, hash: &str, plaintext: &str) -> bool {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return false;
        }

        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };

        // PHC params in the hash take precedence over ours; the digest
        // comparison is constant time.
        self.argon2()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}
