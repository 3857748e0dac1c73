// Password hashing and validation service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use once_cell::sync::Lazy;

use crate::auth::error::AuthError;

/// Stand-in hash verified when the email has no account, so unknown and
/// known emails pay the same Argon2 cost
static DUMMY_HASH: Lazy<String> = Lazy::new(|| {
    PasswordService::hash_password("placeholder-for-unknown-accounts").unwrap_or_default()
});

/// Password service for hashing and verification
#[derive(Clone, Copy, Default)]
pub struct PasswordService;

impl PasswordService {
    /// Hash a password using Argon2id
    pub fn hash_password(password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                tracing::error!("Argon2 hashing failed: {}", e);
                AuthError::PasswordHashError
            })
    }

    /// Verify a password against a hash
    pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            tracing::error!("Stored password hash is malformed: {}", e);
            AuthError::PasswordHashError
        })?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Hash on the blocking pool; Argon2 is deliberately slow
    pub async fn hash_password_async(password: String) -> Result<String, AuthError> {
        tokio::task::spawn_blocking(move || Self::hash_password(&password))
            .await
            .map_err(|e| {
                tracing::error!("Hashing task failed: {}", e);
                AuthError::PasswordHashError
            })?
    }

    /// Verify on the blocking pool
    pub async fn verify_password_async(password: String, hash: String) -> Result<bool, AuthError> {
        tokio::task::spawn_blocking(move || Self::verify_password(&password, &hash))
            .await
            .map_err(|e| {
                tracing::error!("Verification task failed: {}", e);
                AuthError::PasswordHashError
            })?
    }

    /// Run a verification that always fails, on the blocking pool
    pub async fn verify_against_dummy_async(password: String) {
        let result = tokio::task::spawn_blocking(move || {
            Self::verify_password(&password, DUMMY_HASH.as_str())
        })
        .await;
        if let Ok(Ok(true)) = result {
            tracing::error!("Dummy hash unexpectedly matched a login attempt");
        }
    }

    #[cfg(test)]
    pub(crate) fn dummy_hash_computed() -> bool {
        Lazy::get(&DUMMY_HASH).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = PasswordService::hash_password("Senha123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(PasswordService::verify_password("Senha123", &hash).unwrap());
        assert!(!PasswordService::verify_password("Senha124", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = PasswordService::hash_password("Senha123").unwrap();
        let b = PasswordService::hash_password("Senha123").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(PasswordService::verify_password("x", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_dummy_hash_is_a_real_argon2_hash() {
        assert!(DUMMY_HASH.starts_with("$argon2id$"));
        assert!(!PasswordService::verify_password("Senha123", &DUMMY_HASH).unwrap());
    }

    #[tokio::test]
    async fn test_async_wrappers() {
        let hash = PasswordService::hash_password_async("Senha123".to_string())
            .await
            .unwrap();
        assert!(PasswordService::verify_password_async("Senha123".to_string(), hash)
            .await
            .unwrap());
    }
}
