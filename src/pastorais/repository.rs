// Database repository for pastorais

use chrono::Utc;
use sqlx::SqlitePool;

use crate::pastorais::models::{CreatePastoralRequest, Pastoral, UpdatePastoralRequest};

const PASTORAL_COLUMNS: &str = "id, nome, subdomain, paroquia, cidade, email_contato, is_active, \
                                blocked_reason, created_at, updated_at";

#[derive(Clone)]
pub struct PastoralRepository {
    pool: SqlitePool,
}

impl PastoralRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreatePastoralRequest) -> Result<Pastoral, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Pastoral>(&format!(
            "INSERT INTO pastorais (nome, subdomain, paroquia, cidade, email_contato, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, 1, ?, ?) RETURNING {}",
            PASTORAL_COLUMNS
        ))
        .bind(&request.nome)
        .bind(&request.subdomain)
        .bind(&request.paroquia)
        .bind(&request.cidade)
        .bind(&request.email_contato)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Pastoral>, sqlx::Error> {
        sqlx::query_as::<_, Pastoral>(&format!(
            "SELECT {} FROM pastorais WHERE id = ?",
            PASTORAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list(&self) -> Result<Vec<Pastoral>, sqlx::Error> {
        sqlx::query_as::<_, Pastoral>(&format!(
            "SELECT {} FROM pastorais ORDER BY nome",
            PASTORAL_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
    }

    pub async fn update(
        &self,
        id: i64,
        request: UpdatePastoralRequest,
    ) -> Result<Option<Pastoral>, sqlx::Error> {
        let Some(existing) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let pastoral = sqlx::query_as::<_, Pastoral>(&format!(
            "UPDATE pastorais SET nome = ?, subdomain = ?, paroquia = ?, cidade = ?, email_contato = ?, updated_at = ? \
             WHERE id = ? RETURNING {}",
            PASTORAL_COLUMNS
        ))
        .bind(request.nome.unwrap_or(existing.nome))
        .bind(request.subdomain.unwrap_or(existing.subdomain))
        .bind(request.paroquia.or(existing.paroquia))
        .bind(request.cidade.or(existing.cidade))
        .bind(request.email_contato.or(existing.email_contato))
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(pastoral))
    }

    /// Block (reason given) or unblock (None) a pastoral
    pub async fn set_blocked(
        &self,
        id: i64,
        reason: Option<&str>,
    ) -> Result<Option<Pastoral>, sqlx::Error> {
        sqlx::query_as::<_, Pastoral>(&format!(
            "UPDATE pastorais SET is_active = ?, blocked_reason = ?, updated_at = ? \
             WHERE id = ? RETURNING {}",
            PASTORAL_COLUMNS
        ))
        .bind(reason.is_none())
        .bind(reason)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Hard delete; users, encontros and avaliações cascade
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM pastorais WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
