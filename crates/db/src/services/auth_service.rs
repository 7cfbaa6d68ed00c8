// Password hashing and bearer-token hashing for the session store
use bcrypt::{DEFAULT_COST, hash, verify};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {MIN_PASSWORD_LEN} characters")]
    TooShort,
}

pub struct AuthService;

impl AuthService {
    pub fn check_password_policy(password: &str) -> Result<(), PasswordPolicyError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PasswordPolicyError::TooShort);
        }
        Ok(())
    }

    /// Hash a password using bcrypt
    pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
        hash(password, DEFAULT_COST)
    }

    /// Verify a password against a hash. A malformed stored hash counts as a mismatch.
    pub fn verify_password(password: &str, hash: &str) -> bool {
        match verify(password, hash) {
            Ok(valid) => valid,
            Err(e) => {
                tracing::warn!("Stored password hash could not be verified: {}", e);
                false
            }
        }
    }

    /// Opaque bearer token handed to the client once at login.
    pub fn generate_session_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Tokens are high-entropy, so a fast SHA-256 digest is what gets stored and looked up.
    pub fn hash_session_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }
}
