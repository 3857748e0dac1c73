// Database repository for encontros

use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use sqlx::SqlitePool;

use crate::encontros::models::{
    CreateEncontroRequest, Encontro, EncontroPublico, UpdateEncontroRequest,
};

const ENCONTRO_COLUMNS: &str = "id, pastoral_id, nome, data_inicio, data_fim, local, codigo_acesso, \
                                is_active, created_at, updated_at";

/// Random 8 character upper-case access code
pub fn generate_access_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect()
}

#[derive(Clone)]
pub struct EncontroRepository {
    pool: SqlitePool,
}

impl EncontroRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        pastoral_id: i64,
        request: &CreateEncontroRequest,
    ) -> Result<Encontro, sqlx::Error> {
        let now = Utc::now();
        let codigo = request
            .codigo_acesso
            .clone()
            .unwrap_or_else(generate_access_code);

        sqlx::query_as::<_, Encontro>(&format!(
            "INSERT INTO encontros (pastoral_id, nome, data_inicio, data_fim, local, codigo_acesso, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {}",
            ENCONTRO_COLUMNS
        ))
        .bind(pastoral_id)
        .bind(&request.nome)
        .bind(request.data_inicio)
        .bind(request.data_fim)
        .bind(&request.local)
        .bind(codigo)
        .bind(request.is_active.unwrap_or(true))
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }

    /// Find an encontro visible in `scope` (None = every pastoral)
    pub async fn find_by_id(&self, id: i64, scope: Option<i64>) -> Result<Option<Encontro>, sqlx::Error> {
        sqlx::query_as::<_, Encontro>(&format!(
            "SELECT {} FROM encontros WHERE id = ?1 AND (?2 IS NULL OR pastoral_id = ?2)",
            ENCONTRO_COLUMNS
        ))
        .bind(id)
        .bind(scope)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_by_codigo(&self, codigo: &str) -> Result<Option<Encontro>, sqlx::Error> {
        sqlx::query_as::<_, Encontro>(&format!(
            "SELECT {} FROM encontros WHERE codigo_acesso = ?",
            ENCONTRO_COLUMNS
        ))
        .bind(codigo)
        .fetch_optional(&self.pool)
        .await
    }

    /// Public view of an active encontro whose pastoral is active
    pub async fn find_public_by_codigo(
        &self,
        codigo: &str,
    ) -> Result<Option<EncontroPublico>, sqlx::Error> {
        sqlx::query_as::<_, EncontroPublico>(
            "SELECT e.id, e.nome, e.data_inicio, e.data_fim, e.local, p.nome AS pastoral_nome \
             FROM encontros e JOIN pastorais p ON p.id = e.pastoral_id \
             WHERE e.codigo_acesso = ? AND e.is_active = 1 AND p.is_active = 1",
        )
        .bind(codigo)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list(&self, scope: Option<i64>) -> Result<Vec<Encontro>, sqlx::Error> {
        sqlx::query_as::<_, Encontro>(&format!(
            "SELECT {} FROM encontros WHERE (?1 IS NULL OR pastoral_id = ?1) \
             ORDER BY data_inicio DESC, id DESC",
            ENCONTRO_COLUMNS
        ))
        .bind(scope)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn update(
        &self,
        existing: Encontro,
        request: UpdateEncontroRequest,
    ) -> Result<Encontro, sqlx::Error> {
        sqlx::query_as::<_, Encontro>(&format!(
            "UPDATE encontros SET nome = ?, data_inicio = ?, data_fim = ?, local = ?, codigo_acesso = ?, \
             is_active = ?, updated_at = ? WHERE id = ? RETURNING {}",
            ENCONTRO_COLUMNS
        ))
        .bind(request.nome.unwrap_or(existing.nome))
        .bind(request.data_inicio.or(existing.data_inicio))
        .bind(request.data_fim.or(existing.data_fim))
        .bind(request.local.or(existing.local))
        .bind(request.codigo_acesso.unwrap_or(existing.codigo_acesso))
        .bind(request.is_active.unwrap_or(existing.is_active))
        .bind(Utc::now())
        .bind(existing.id)
        .fetch_one(&self.pool)
        .await
    }

    /// Delete in scope; linked avaliações keep their rows with encontro_id NULL
    pub async fn delete(&self, id: i64, scope: Option<i64>) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM encontros WHERE id = ?1 AND (?2 IS NULL OR pastoral_id = ?2)",
        )
        .bind(id)
        .bind(scope)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avaliacoes::{models::fixtures::evaluation, repository::AvaliacaoRepository};
    use crate::db::create_memory_pool;
    use crate::pastorais::{models::CreatePastoralRequest, repository::PastoralRepository};

    async fn pastoral(pool: &SqlitePool, subdomain: &str) -> i64 {
        PastoralRepository::new(pool.clone())
            .create(&CreatePastoralRequest {
                nome: "Pastoral".to_string(),
                subdomain: subdomain.to_string(),
                paroquia: None,
                cidade: None,
                email_contato: None,
            })
            .await
            .unwrap()
            .id
    }

    fn request(codigo: Option<&str>) -> CreateEncontroRequest {
        CreateEncontroRequest {
            pastoral_id: None,
            nome: "Encontro".to_string(),
            data_inicio: None,
            data_fim: None,
            local: None,
            codigo_acesso: codigo.map(str::to_string),
            is_active: None,
        }
    }

    #[test]
    fn test_generated_access_code_shape() {
        let code = generate_access_code();
        assert_eq!(code.len(), 8);
        assert!(crate::validation::ACCESS_CODE_RE.is_match(&code));
    }

    #[tokio::test]
    async fn test_scope_hides_other_pastorais() {
        let pool = create_memory_pool().await.unwrap();
        let a = pastoral(&pool, "pastoral-a").await;
        let b = pastoral(&pool, "pastoral-b").await;
        let repo = EncontroRepository::new(pool);

        let encontro = repo.create(a, &request(Some("CODE-A"))).await.unwrap();
        assert!(repo.find_by_id(encontro.id, Some(a)).await.unwrap().is_some());
        assert!(repo.find_by_id(encontro.id, Some(b)).await.unwrap().is_none());
        assert!(repo.find_by_id(encontro.id, None).await.unwrap().is_some());
        assert!(!repo.delete(encontro.id, Some(b)).await.unwrap());
    }

    #[tokio::test]
    async fn test_public_lookup_requires_active_pastoral() {
        let pool = create_memory_pool().await.unwrap();
        let a = pastoral(&pool, "pastoral-a").await;
        let repo = EncontroRepository::new(pool.clone());
        repo.create(a, &request(Some("CODE-A"))).await.unwrap();

        assert!(repo.find_public_by_codigo("CODE-A").await.unwrap().is_some());

        PastoralRepository::new(pool)
            .set_blocked(a, Some("bloqueada"))
            .await
            .unwrap();
        assert!(repo.find_public_by_codigo("CODE-A").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_keeps_avaliacoes() {
        let pool = create_memory_pool().await.unwrap();
        let a = pastoral(&pool, "pastoral-a").await;
        let repo = EncontroRepository::new(pool.clone());
        let encontro = repo.create(a, &request(None)).await.unwrap();

        let avaliacoes = AvaliacaoRepository::new(pool);
        let id = avaliacoes
            .create(Some(encontro.id), Some(a), &evaluation(4))
            .await
            .unwrap();

        assert!(repo.delete(encontro.id, None).await.unwrap());

        let kept = avaliacoes.find_by_id(id, None).await.unwrap().unwrap();
        assert_eq!(kept.encontro_id, None);
        assert_eq!(kept.pastoral_id, Some(a));
    }
}
