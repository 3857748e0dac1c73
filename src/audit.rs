// Audit Logger
//
// Records administrative and authentication events in `audit_logs`.
// Failures are logged and never propagated to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, SqlitePool};
use utoipa::ToSchema;

/// Actions written to the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Block,
    Unblock,
    Login,
    Logout,
    PasswordReset,
    PasswordChange,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::Block => "block",
            AuditAction::Unblock => "unblock",
            AuditAction::Login => "login",
            AuditAction::Logout => "logout",
            AuditAction::PasswordReset => "password_reset",
            AuditAction::PasswordChange => "password_change",
        }
    }
}

/// One event to record
#[derive(Debug, Clone)]
pub struct AuditEvent<'a> {
    pub user_id: Option<i64>,
    pub action: AuditAction,
    pub entity: &'a str,
    pub entity_id: Option<i64>,
    pub details: JsonValue,
    pub ip: Option<&'a str>,
}

impl<'a> AuditEvent<'a> {
    pub fn new(action: AuditAction, entity: &'a str) -> Self {
        Self {
            user_id: None,
            action,
            entity,
            entity_id: None,
            details: JsonValue::Null,
            ip: None,
        }
    }

    pub fn by(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn entity_id(mut self, id: i64) -> Self {
        self.entity_id = Some(id);
        self
    }

    pub fn details(mut self, details: JsonValue) -> Self {
        self.details = details;
        self
    }

    pub fn ip(mut self, ip: &'a str) -> Self {
        self.ip = Some(ip);
        self
    }
}

#[derive(FromRow)]
struct AuditRow {
    id: i64,
    user_id: Option<i64>,
    action: String,
    entity: String,
    entity_id: Option<i64>,
    details: Option<String>,
    ip: Option<String>,
    created_at: DateTime<Utc>,
}

/// Audit record as returned by the admin API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditRecord {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<i64>,
    #[schema(value_type = Object)]
    pub details: Option<JsonValue>,
    pub ip: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditRow> for AuditRecord {
    fn from(row: AuditRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            action: row.action,
            entity: row.entity,
            entity_id: row.entity_id,
            details: row.details.and_then(|raw| serde_json::from_str(&raw).ok()),
            ip: row.ip,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct AuditLogger {
    pool: SqlitePool,
}

impl AuditLogger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record an event; errors are logged and swallowed
    pub async fn log(&self, event: AuditEvent<'_>) {
        if let Err(e) = self.insert_audit_record(&event).await {
            tracing::error!(
                "Failed to write audit record {} {}: {}",
                event.action.as_str(),
                event.entity,
                e
            );
        }
    }

    async fn insert_audit_record(&self, event: &AuditEvent<'_>) -> Result<(), sqlx::Error> {
        let details = match &event.details {
            JsonValue::Null => None,
            other => Some(other.to_string()),
        };

        sqlx::query(
            "INSERT INTO audit_logs (user_id, action, entity, entity_id, details, ip, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(event.user_id)
        .bind(event.action.as_str())
        .bind(event.entity)
        .bind(event.entity_id)
        .bind(details)
        .bind(event.ip)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Newest records first
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<AuditRecord>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT id, user_id, action, entity, entity_id, details, ip, created_at \
             FROM audit_logs ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AuditRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;
    use serde_json::json;

    #[tokio::test]
    async fn test_log_and_list_newest_first() {
        let pool = create_memory_pool().await.unwrap();
        let audit = AuditLogger::new(pool);

        audit
            .log(AuditEvent::new(AuditAction::Create, "pastoral").entity_id(1))
            .await;
        audit
            .log(
                AuditEvent::new(AuditAction::Block, "pastoral")
                    .entity_id(1)
                    .details(json!({ "reason": "inadimplente" }))
                    .ip("10.0.0.1"),
            )
            .await;

        let records = audit.list_recent(10).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, "block");
        assert_eq!(records[0].details, Some(json!({ "reason": "inadimplente" })));
        assert_eq!(records[0].ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(records[1].details, None);
    }

    #[tokio::test]
    async fn test_failed_insert_does_not_panic() {
        let pool = create_memory_pool().await.unwrap();
        let audit = AuditLogger::new(pool);

        // user 999 does not exist, so the foreign key rejects the row
        audit
            .log(AuditEvent::new(AuditAction::Login, "user").by(999))
            .await;

        assert!(audit.list_recent(10).await.unwrap().is_empty());
    }

    #[test]
    fn test_action_names() {
        assert_eq!(AuditAction::PasswordReset.as_str(), "password_reset");
        assert_eq!(AuditAction::Unblock.as_str(), "unblock");
    }
}
