//! Password credentials and the acting identity.
//!
//! The identity is an explicit value threaded through every handler
//! call, never ambient state. Passwords are stored as Argon2id hashes.

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::types::User;
use anyhow::{Result, anyhow};
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

/// The acting identity for one request: an authenticated user or nobody.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    user: Option<User>,
}

impl Identity {
    /// An unauthenticated visitor.
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    /// The identity of a logged-in user.
    pub fn authenticated(user: User) -> Self {
        Self { user: Some(user) }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id)
    }

    /// The authenticated user, or a not-authenticated error prompting
    /// the caller to re-authenticate.
    pub fn require(&self) -> AppResult<&User> {
        self.user.as_ref().ok_or_else(AppError::not_authenticated)
    }
}

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored hash.
pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Check a username/password pair against the store. Returns the user
/// on success, `None` for an unknown username or a wrong password.
pub fn authenticate(db: &Database, username: &str, password: &str) -> Result<Option<User>> {
    let Some(user) = db.get_user_by_username(username)? else {
        return Ok(None);
    };

    if verify_password(&user.password_hash, password) {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hash_password("secret").unwrap();
        assert!(verify_password(&hash, "secret"));
        assert!(!verify_password(&hash, "wrong"));
    }

    #[test]
    fn verify_rejects_garbage_hash() {
        assert!(!verify_password("not-a-hash", "secret"));
    }

    #[test]
    fn anonymous_identity_is_rejected_by_require() {
        let identity = Identity::anonymous();
        assert!(!identity.is_authenticated());
        let err = identity.require().unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAuthenticated);
    }
}
