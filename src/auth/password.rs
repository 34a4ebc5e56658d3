//! Password hashing and verification using bcrypt

use crate::core::error::{GatewayError, Result};

/// bcrypt hasher with a fixed cost factor
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, password: &str) -> Result<String> {
        bcrypt::hash(password, self.cost)
            .map_err(|e| GatewayError::HashingError(format!("Failed to hash password: {}", e)))
    }

    /// Verify a password against a stored hash
    ///
    /// A mismatch is `Ok(false)`; only a hash this hasher could not have
    /// produced is an error.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        bcrypt::verify(password, hash)
            .map_err(|e| GatewayError::HashingError(format!("Failed to verify password: {}", e)))
    }
}
