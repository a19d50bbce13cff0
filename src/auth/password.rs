//! Password hashing with Argon2id.
//!
//! Hash parameters are configurable so tests can use cheap settings while
//! production keeps the defaults.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params, Version,
};

use crate::config::PasswordConfig;
use crate::errors::{Error, Result};

/// Argon2 tuning knobs, decoupled from the config structs so the hash
/// helpers can be used without a full [`crate::config::Config`].
#[derive(Debug, Clone, Copy)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl From<&PasswordConfig> for Argon2Params {
    fn from(config: &PasswordConfig) -> Self {
        Self {
            memory_kib: config.argon2_memory_kib,
            iterations: config.argon2_iterations,
            parallelism: config.argon2_parallelism,
        }
    }
}

fn build_argon2(params: Argon2Params) -> Result<Argon2<'static>> {
    let params = Params::new(params.memory_kib, params.iterations, params.parallelism, None)
        .map_err(|e| Error::Other(anyhow::anyhow!("invalid argon2 parameters: {e}")))?;
    Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password into a PHC string suitable for storage.
pub fn hash_string(password: &str, params: Argon2Params) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = build_argon2(params)?;
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Other(anyhow::anyhow!("failed to hash password: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC string.
///
/// Returns `Ok(false)` for a mismatch; `Err` only when the stored hash is
/// malformed.
pub fn verify_string(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| Error::Other(anyhow::anyhow!("stored password hash is malformed: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(Error::Other(anyhow::anyhow!(
            "failed to verify password: {e}"
        ))),
    }
}

#[cfg(test)]
pub(crate) fn test_params() -> Argon2Params {
    // Minimum legal settings, to keep the test suite fast
    Argon2Params {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_string("correct horse battery staple", test_params()).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_string("correct horse battery staple", &hash).unwrap());
        assert!(!verify_string("wrong password", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_string("hunter2", test_params()).unwrap();
        let b = hash_string("hunter2", test_params()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(verify_string("anything", "not-a-phc-string").is_err());
    }
}
