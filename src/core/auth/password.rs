//! Password hashing
//!
//! bcrypt with an embedded cost factor and automatic salt generation.
//! Plaintext passwords are never logged or returned from this module.

/// Default bcrypt cost (12 is recommended for production)
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Lowest cost a hasher may be configured with
pub const MIN_BCRYPT_COST: u32 = 12;

/// Minimum accepted password length (characters)
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// bcrypt only reads the first 72 bytes of its input
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Password errors
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password must not be empty")]
    Empty,

    #[error("bcrypt cost must be between 12 and 31, got {0}")]
    InvalidCost(u32),

    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Password hashing task failed: {0}")]
    TaskFailed(String),
}

/// bcrypt password hasher
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: DEFAULT_BCRYPT_COST,
        }
    }
}

impl PasswordHasher {
    /// Create a hasher with the default cost
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hasher with a custom cost
    pub fn with_cost(cost: u32) -> Result<Self, PasswordError> {
        if !(MIN_BCRYPT_COST..=31).contains(&cost) {
            return Err(PasswordError::InvalidCost(cost));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        if plaintext.is_empty() {
            return Err(PasswordError::Empty);
        }

        bcrypt::hash(plaintext, self.cost).map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    /// Compare a plaintext password with a stored digest.
    ///
    /// A malformed digest is treated as a mismatch.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        bcrypt::verify(plaintext, digest).unwrap_or(false)
    }

    /// Hash on the blocking thread pool
    pub async fn hash_blocking(&self, plaintext: String) -> Result<String, PasswordError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| PasswordError::TaskFailed(e.to_string()))?
    }

    /// Verify on the blocking thread pool
    pub async fn verify_blocking(
        &self,
        plaintext: String,
        digest: String,
    ) -> Result<bool, PasswordError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &digest))
            .await
            .map_err(|e| PasswordError::TaskFailed(e.to_string()))
    }
}

/// Check password strength.
///
/// Requires at least 8 characters, at most 72 bytes, one letter and one digit.
pub fn validate_password_strength(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err("Password must be at least 8 characters long");
    }

    if password.len() > MAX_PASSWORD_BYTES {
        return Err("Password must be at most 72 bytes long");
    }

    if !password.chars().any(|c| c.is_alphabetic()) {
        return Err("Password must contain at least one letter");
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit");
    }

    Ok(())
}
