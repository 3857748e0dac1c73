// Database repositories for users and tokens

use crate::auth::models::{PasswordResetToken, RefreshToken, Role, User};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

const USER_COLUMNS: &str = "id, email, password_hash, nome, role, pastoral_id, is_active, \
                            last_login, created_at, updated_at";

/// Hash a token using SHA-256; only hashes are ever stored
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Fields needed to insert a user
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub nome: &'a str,
    pub role: Role,
    pub pastoral_id: Option<i64>,
}

/// Partial update of a user; None keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub nome: Option<String>,
    pub role: Option<Role>,
    pub pastoral_id: Option<Option<i64>>,
    pub is_active: Option<bool>,
}

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new UserRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create_user(&self, new_user: NewUser<'_>) -> Result<User, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, nome, role, pastoral_id, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, 1, ?, ?) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(new_user.email)
        .bind(new_user.password_hash)
        .bind(new_user.nome)
        .bind(new_user.role)
        .bind(new_user.pastoral_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    /// Find a user by email (case-insensitive)
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = ? COLLATE NOCASE",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// List users, optionally restricted to one pastoral
    pub async fn list(&self, pastoral_id: Option<i64>) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE (? IS NULL OR pastoral_id = ?) ORDER BY nome",
            USER_COLUMNS
        ))
        .bind(pastoral_id)
        .bind(pastoral_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Apply a partial update and return the stored row
    pub async fn update(&self, id: i64, changes: UserChanges) -> Result<Option<User>, sqlx::Error> {
        let Some(existing) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET email = ?, nome = ?, role = ?, pastoral_id = ?, is_active = ?, updated_at = ? \
             WHERE id = ? RETURNING {}",
            USER_COLUMNS
        ))
        .bind(changes.email.unwrap_or(existing.email))
        .bind(changes.nome.unwrap_or(existing.nome))
        .bind(changes.role.unwrap_or(existing.role))
        .bind(changes.pastoral_id.unwrap_or(existing.pastoral_id))
        .bind(changes.is_active.unwrap_or(existing.is_active))
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(user))
    }

    /// Replace the stored password hash
    pub async fn set_password(&self, id: i64, password_hash: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Record a successful login
    pub async fn touch_last_login(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Hard delete; dependent tokens and audit rows cascade
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count active super admins
    pub async fn count_active_super_admins(&self) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM users WHERE role = 'super_admin' AND is_active = 1",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

/// Token repository for refresh token operations
#[derive(Clone)]
pub struct TokenRepository {
    pool: SqlitePool,
}

impl TokenRepository {
    /// Create a new TokenRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a refresh token (hashed with SHA-256)
    pub async fn store_refresh_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO refresh_tokens (user_id, token_hash, expires_at, revoked, created_at) \
             VALUES (?, ?, ?, 0, ?)",
        )
        .bind(user_id)
        .bind(hash_token(token))
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Find a refresh token that is stored, not revoked and not expired
    pub async fn find_active(&self, token: &str) -> Result<Option<RefreshToken>, sqlx::Error> {
        sqlx::query_as::<_, RefreshToken>(
            "SELECT id, user_id, token_hash, expires_at, revoked, created_at \
             FROM refresh_tokens \
             WHERE token_hash = ? AND revoked = 0 AND expires_at > ?",
        )
        .bind(hash_token(token))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
    }

    /// Revoke a single refresh token
    pub async fn revoke(&self, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE token_hash = ?")
            .bind(hash_token(token))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke every refresh token of a user
    pub async fn revoke_all_for_user(&self, user_id: i64) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE user_id = ? AND revoked = 0")
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// Delete expired or revoked tokens
    pub async fn delete_stale_tokens(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < ? OR revoked = 1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Repository for password reset tokens
#[derive(Clone)]
pub struct PasswordResetRepository {
    pool: SqlitePool,
}

impl PasswordResetRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a new reset token, invalidating any earlier unused ones
    pub async fn create(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE password_reset_tokens SET used = 1 WHERE user_id = ? AND used = 0")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO password_reset_tokens (user_id, token_hash, expires_at, used, created_at) \
             VALUES (?, ?, ?, 0, ?)",
        )
        .bind(user_id)
        .bind(hash_token(token))
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Find an unused, unexpired token
    pub async fn find_valid(&self, token: &str) -> Result<Option<PasswordResetToken>, sqlx::Error> {
        sqlx::query_as::<_, PasswordResetToken>(
            "SELECT id, user_id, token_hash, expires_at, used, created_at \
             FROM password_reset_tokens \
             WHERE token_hash = ? AND used = 0 AND expires_at > ?",
        )
        .bind(hash_token(token))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
    }

    /// Mark a token as consumed; false if it was already used
    pub async fn mark_used(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE password_reset_tokens SET used = 1 WHERE id = ? AND used = 0")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete expired or used tokens
    pub async fn delete_stale_tokens(&self) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM password_reset_tokens WHERE expires_at < ? OR used = 1")
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;
    use chrono::Duration;

    async fn seed_user(pool: &SqlitePool) -> User {
        UserRepository::new(pool.clone())
            .create_user(NewUser {
                email: "Admin@Example.com",
                password_hash: "hash",
                nome: "Admin",
                role: Role::SuperAdmin,
                pastoral_id: None,
            })
            .await
            .expect("Failed to create user")
    }

    #[test]
    fn test_hash_token_is_hex_sha256() {
        let hash = hash_token("abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_find_by_email_is_case_insensitive() {
        let pool = create_memory_pool().await.unwrap();
        let user = seed_user(&pool).await;
        let repo = UserRepository::new(pool);

        let found = repo.find_by_email("admin@example.COM").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn test_duplicate_email_violates_unique() {
        let pool = create_memory_pool().await.unwrap();
        seed_user(&pool).await;
        let repo = UserRepository::new(pool);

        let err = repo
            .create_user(NewUser {
                email: "admin@example.com",
                password_hash: "hash",
                nome: "Other",
                role: Role::SuperAdmin,
                pastoral_id: None,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("UNIQUE constraint failed"));
    }

    #[tokio::test]
    async fn test_pastoral_admin_requires_pastoral() {
        let pool = create_memory_pool().await.unwrap();
        let repo = UserRepository::new(pool);
        let err = repo
            .create_user(NewUser {
                email: "coord@example.com",
                password_hash: "hash",
                nome: "Coord",
                role: Role::PastoralAdmin,
                pastoral_id: None,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("CHECK constraint failed"));
    }

    #[tokio::test]
    async fn test_refresh_token_lifecycle() {
        let pool = create_memory_pool().await.unwrap();
        let user = seed_user(&pool).await;
        let repo = TokenRepository::new(pool);

        repo.store_refresh_token(user.id, "token-1", Utc::now() + Duration::days(1))
            .await
            .unwrap();
        let stored = repo.find_active("token-1").await.unwrap().unwrap();
        assert_eq!(stored.user_id, user.id);
        assert_ne!(stored.token_hash, "token-1");

        assert!(repo.revoke("token-1").await.unwrap());
        assert!(repo.find_active("token-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_refresh_token_not_active() {
        let pool = create_memory_pool().await.unwrap();
        let user = seed_user(&pool).await;
        let repo = TokenRepository::new(pool);

        repo.store_refresh_token(user.id, "old", Utc::now() - Duration::minutes(1))
            .await
            .unwrap();
        assert!(repo.find_active("old").await.unwrap().is_none());
        assert_eq!(repo.delete_stale_tokens().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_new_reset_token_invalidates_previous() {
        let pool = create_memory_pool().await.unwrap();
        let user = seed_user(&pool).await;
        let repo = PasswordResetRepository::new(pool);
        let expires = Utc::now() + Duration::hours(1);

        repo.create(user.id, "first", expires).await.unwrap();
        repo.create(user.id, "second", expires).await.unwrap();

        assert!(repo.find_valid("first").await.unwrap().is_none());
        let second = repo.find_valid("second").await.unwrap().unwrap();
        assert!(repo.mark_used(second.id).await.unwrap());
        assert!(!repo.mark_used(second.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_deleting_user_cascades_tokens() {
        let pool = create_memory_pool().await.unwrap();
        let user = seed_user(&pool).await;
        let tokens = TokenRepository::new(pool.clone());
        tokens
            .store_refresh_token(user.id, "t", Utc::now() + Duration::days(1))
            .await
            .unwrap();

        assert!(UserRepository::new(pool.clone()).delete(user.id).await.unwrap());

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
