//! Password hashing capability
//!
//! Credentials are stored only as salted digests. The scheme is chosen
//! once at startup and passed explicitly to whatever needs it; there is
//! no runtime substitution of primitives.

use crate::{CoreError, CoreResult};
use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::Argon2;

/// Hash-and-verify capability for account credentials.
pub trait PasswordScheme: Send + Sync {
    fn hash_password(&self, password: &str) -> CoreResult<String>;
    fn verify_password(&self, password: &str, digest: &str) -> bool;
}

/// Argon2id with library-default parameters.
#[derive(Debug, Default)]
pub struct Argon2Scheme;

impl PasswordScheme for Argon2Scheme {
    fn hash_password(&self, password: &str) -> CoreResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| CoreError::Hash(e.to_string()))
    }

    fn verify_password(&self, password: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}
