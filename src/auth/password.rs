//! One-way password hashing.

use anyhow::{Context, Result};

use super::error::AuthError;

/// Work factor used when no explicit cost is configured.
const DEFAULT_HASH_COST: u32 = 10;

/// bcrypt wrapper with a fixed work factor.
///
/// Hashing salts internally, so equal passwords never produce equal
/// hashes; comparison happens inside `bcrypt::verify` without an
/// early-exit on mismatch.
#[derive(Clone, Copy, Debug)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cost: DEFAULT_HASH_COST,
        }
    }

    #[must_use]
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    /// Hash a plaintext password for storage.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying RNG fails.
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        bcrypt::hash(plaintext, self.cost).context("failed to hash password")
    }

    /// Check a plaintext password against a stored hash.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::CorruptCredential`] when the stored hash is
    /// malformed; a wrong password is `Ok(false)`, never an error.
    pub fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, AuthError> {
        bcrypt::verify(plaintext, hash).map_err(|_| AuthError::CorruptCredential)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low cost keeps the test suite fast; production uses the default.
    fn hasher() -> PasswordHasher {
        PasswordHasher::new().with_cost(4)
    }

    #[test]
    fn hash_then_verify_round_trips() -> Result<()> {
        let hasher = hasher();
        let hash = hasher.hash("correct horse battery staple")?;
        assert!(hasher.verify("correct horse battery staple", &hash)?);
        Ok(())
    }

    #[test]
    fn single_character_mutation_fails() -> Result<()> {
        let hasher = hasher();
        let hash = hasher.hash("hunter2")?;
        assert!(!hasher.verify("hunter3", &hash)?);
        assert!(!hasher.verify("Hunter2", &hash)?);
        assert!(!hasher.verify("", &hash)?);
        Ok(())
    }

    #[test]
    fn equal_passwords_produce_distinct_hashes() -> Result<()> {
        let hasher = hasher();
        let first = hasher.hash("hunter2")?;
        let second = hasher.hash("hunter2")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn malformed_hash_is_corrupt_credential() {
        let hasher = hasher();
        let result = hasher.verify("hunter2", "not-a-bcrypt-hash");
        assert!(matches!(result, Err(AuthError::CorruptCredential)));
    }
}
