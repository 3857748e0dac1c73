// Login attempt monitor
//
// Records every login attempt and blocks an IP or an email address once too
// many failures accumulate inside the rolling window.

use chrono::{Duration, Utc};
use sqlx::SqlitePool;

use crate::auth::error::AuthError;

/// Rolling window over which failures are counted
pub const FAILURE_WINDOW_MINUTES: i64 = 15;

/// Failures within the window that trigger a block
pub const MAX_FAILED_ATTEMPTS: i64 = 5;

/// Attempts older than this are purged by the cleanup task
pub const RETENTION_HOURS: i64 = 24;

#[derive(Clone)]
pub struct LoginMonitor {
    pool: SqlitePool,
}

impl LoginMonitor {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Refuse the attempt when the IP or the email is over the failure limit
    pub async fn check(&self, ip: &str, email: &str) -> Result<(), AuthError> {
        let since = Utc::now() - Duration::minutes(FAILURE_WINDOW_MINUTES);

        let (by_ip,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM login_attempts WHERE ip = ? AND success = 0 AND attempted_at > ?",
        )
        .bind(ip)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        let (by_email,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM login_attempts \
             WHERE email = ? COLLATE NOCASE AND success = 0 AND attempted_at > ?",
        )
        .bind(email)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        if by_ip >= MAX_FAILED_ATTEMPTS || by_email >= MAX_FAILED_ATTEMPTS {
            tracing::warn!(
                "Login blocked: ip={}, email={}, failures_by_ip={}, failures_by_email={}",
                ip,
                email,
                by_ip,
                by_email
            );
            return Err(AuthError::TooManyAttempts {
                retry_after_secs: (FAILURE_WINDOW_MINUTES * 60) as u64,
            });
        }

        Ok(())
    }

    /// Record the outcome of a login attempt
    pub async fn record(&self, ip: &str, email: &str, success: bool) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO login_attempts (ip, email, success, attempted_at) VALUES (?, ?, ?, ?)",
        )
        .bind(ip)
        .bind(email)
        .bind(success)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete attempts older than the retention period
    pub async fn cleanup(&self) -> Result<u64, sqlx::Error> {
        let cutoff = Utc::now() - Duration::hours(RETENTION_HOURS);
        let result = sqlx::query("DELETE FROM login_attempts WHERE attempted_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;

    #[tokio::test]
    async fn test_blocks_after_five_failures_by_ip() {
        let pool = create_memory_pool().await.unwrap();
        let monitor = LoginMonitor::new(pool);

        for i in 0..MAX_FAILED_ATTEMPTS {
            monitor.check("10.0.0.1", &format!("user{}@example.com", i)).await.unwrap();
            monitor
                .record("10.0.0.1", &format!("user{}@example.com", i), false)
                .await
                .unwrap();
        }

        let result = monitor.check("10.0.0.1", "another@example.com").await;
        assert!(matches!(result, Err(AuthError::TooManyAttempts { .. })));
        assert!(monitor.check("10.0.0.2", "another@example.com").await.is_ok());
    }

    #[tokio::test]
    async fn test_blocks_after_five_failures_by_email() {
        let pool = create_memory_pool().await.unwrap();
        let monitor = LoginMonitor::new(pool);

        for i in 0..MAX_FAILED_ATTEMPTS {
            monitor
                .record(&format!("10.0.0.{}", i), "target@example.com", false)
                .await
                .unwrap();
        }

        let result = monitor.check("192.168.0.1", "TARGET@example.com").await;
        assert!(matches!(result, Err(AuthError::TooManyAttempts { .. })));
    }

    #[tokio::test]
    async fn test_successes_do_not_count() {
        let pool = create_memory_pool().await.unwrap();
        let monitor = LoginMonitor::new(pool);

        for _ in 0..10 {
            monitor.record("10.0.0.1", "ok@example.com", true).await.unwrap();
        }
        assert!(monitor.check("10.0.0.1", "ok@example.com").await.is_ok());
    }

    #[tokio::test]
    async fn test_old_failures_fall_outside_window() {
        let pool = create_memory_pool().await.unwrap();
        let old = Utc::now() - Duration::minutes(FAILURE_WINDOW_MINUTES + 1);
        for _ in 0..MAX_FAILED_ATTEMPTS {
            sqlx::query(
                "INSERT INTO login_attempts (ip, email, success, attempted_at) VALUES (?, ?, 0, ?)",
            )
            .bind("10.0.0.1")
            .bind("old@example.com")
            .bind(old)
            .execute(&pool)
            .await
            .unwrap();
        }

        let monitor = LoginMonitor::new(pool);
        assert!(monitor.check("10.0.0.1", "old@example.com").await.is_ok());
    }

    #[tokio::test]
    async fn test_cleanup_removes_rows_past_retention() {
        let pool = create_memory_pool().await.unwrap();
        let stale = Utc::now() - Duration::hours(RETENTION_HOURS + 1);
        sqlx::query(
            "INSERT INTO login_attempts (ip, email, success, attempted_at) VALUES ('1', 'a', 0, ?)",
        )
        .bind(stale)
        .execute(&pool)
        .await
        .unwrap();

        let monitor = LoginMonitor::new(pool);
        monitor.record("2", "b", false).await.unwrap();

        assert_eq!(monitor.cleanup().await.unwrap(), 1);
    }
}
