// Database repository for survey responses

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::avaliacoes::models::{
    Ambientes, Avaliacao, AvaliacaoDetail, AvaliacaoGeral, AvaliacaoSummary, Equipe,
    EvaluationData, InteressePastoral, Interessado, MensagemFinal, Musicas, Palestras,
    PreEncontro, Refeicoes,
};
use crate::avaliacoes::statistics::{rating_columns, ScoreRow};

#[derive(Clone)]
pub struct AvaliacaoRepository {
    pool: SqlitePool,
}

impl AvaliacaoRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a response and its nine sections atomically
    pub async fn create(
        &self,
        encontro_id: Option<i64>,
        pastoral_id: Option<i64>,
        data: &EvaluationData,
    ) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO avaliacoes (encontro_id, pastoral_id, nome_casal, created_at) \
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(encontro_id)
        .bind(pastoral_id)
        .bind(&data.nome_casal)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        let s = &data.pre_encontro;
        sqlx::query(
            "INSERT INTO pre_encontro (avaliacao_id, como_soube, facilidade_inscricao, comunicacao_previa, comentario) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&s.como_soube)
        .bind(s.facilidade_inscricao)
        .bind(s.comunicacao_previa)
        .bind(&s.comentario)
        .execute(&mut *tx)
        .await?;

        let s = &data.palestras;
        sqlx::query(
            "INSERT INTO palestras (avaliacao_id, conteudo, clareza, duracao, palestrantes, palestra_destaque, comentario) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(s.conteudo)
        .bind(s.clareza)
        .bind(s.duracao)
        .bind(s.palestrantes)
        .bind(&s.palestra_destaque)
        .bind(&s.comentario)
        .execute(&mut *tx)
        .await?;

        let s = &data.ambientes;
        sqlx::query(
            "INSERT INTO ambientes (avaliacao_id, conforto, limpeza, acustica, climatizacao, comentario) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(s.conforto)
        .bind(s.limpeza)
        .bind(s.acustica)
        .bind(s.climatizacao)
        .bind(&s.comentario)
        .execute(&mut *tx)
        .await?;

        let s = &data.refeicoes;
        sqlx::query(
            "INSERT INTO refeicoes (avaliacao_id, qualidade, quantidade, variedade, atendimento, comentario) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(s.qualidade)
        .bind(s.quantidade)
        .bind(s.variedade)
        .bind(s.atendimento)
        .bind(&s.comentario)
        .execute(&mut *tx)
        .await?;

        let s = &data.musicas;
        sqlx::query(
            "INSERT INTO musicas (avaliacao_id, selecao, execucao, volume, comentario) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(s.selecao)
        .bind(s.execucao)
        .bind(s.volume)
        .bind(&s.comentario)
        .execute(&mut *tx)
        .await?;

        let s = &data.equipe;
        sqlx::query(
            "INSERT INTO equipe (avaliacao_id, acolhimento, organizacao, pontualidade, disponibilidade, comentario) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(s.acolhimento)
        .bind(s.organizacao)
        .bind(s.pontualidade)
        .bind(s.disponibilidade)
        .bind(&s.comentario)
        .execute(&mut *tx)
        .await?;

        let s = &data.avaliacao_geral;
        sqlx::query(
            "INSERT INTO avaliacao_geral (avaliacao_id, nota_geral, expectativas_atendidas, recomendaria, pontos_positivos, pontos_melhorar) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(s.nota_geral)
        .bind(s.expectativas_atendidas)
        .bind(s.recomendaria)
        .bind(&s.pontos_positivos)
        .bind(&s.pontos_melhorar)
        .execute(&mut *tx)
        .await?;

        let s = &data.pastoral;
        sqlx::query(
            "INSERT INTO interesse_pastoral (avaliacao_id, interesse, nome_contato, telefone, email, areas_interesse, melhor_horario) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(s.interesse)
        .bind(&s.nome_contato)
        .bind(&s.telefone)
        .bind(&s.email)
        .bind(&s.areas_interesse)
        .bind(&s.melhor_horario)
        .execute(&mut *tx)
        .await?;

        let s = &data.mensagem_final;
        sqlx::query(
            "INSERT INTO mensagem_final (avaliacao_id, mensagem, autoriza_divulgacao) VALUES (?, ?, ?)",
        )
        .bind(id)
        .bind(&s.mensagem)
        .bind(s.autoriza_divulgacao)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    /// List responses visible in `scope` (None = every pastoral), newest first
    pub async fn list(
        &self,
        scope: Option<i64>,
        encontro_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AvaliacaoSummary>, sqlx::Error> {
        sqlx::query_as::<_, AvaliacaoSummary>(
            r#"
            SELECT a.id, a.encontro_id, e.nome AS encontro_nome, a.pastoral_id, a.nome_casal,
                   g.nota_geral, g.recomendaria, ip.interesse AS interesse_pastoral, a.created_at
            FROM avaliacoes a
            LEFT JOIN encontros e ON e.id = a.encontro_id
            LEFT JOIN avaliacao_geral g ON g.avaliacao_id = a.id
            LEFT JOIN interesse_pastoral ip ON ip.avaliacao_id = a.id
            WHERE (?1 IS NULL OR a.pastoral_id = ?1)
              AND (?2 IS NULL OR a.encontro_id = ?2)
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(scope)
        .bind(encontro_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn find_by_id(&self, id: i64, scope: Option<i64>) -> Result<Option<Avaliacao>, sqlx::Error> {
        sqlx::query_as::<_, Avaliacao>(
            "SELECT id, encontro_id, pastoral_id, nome_casal, created_at FROM avaliacoes \
             WHERE id = ?1 AND (?2 IS NULL OR pastoral_id = ?2)",
        )
        .bind(id)
        .bind(scope)
        .fetch_optional(&self.pool)
        .await
    }

    /// Load a response with all of its sections
    pub async fn find_detail(
        &self,
        id: i64,
        scope: Option<i64>,
    ) -> Result<Option<AvaliacaoDetail>, sqlx::Error> {
        let Some(avaliacao) = self.find_by_id(id, scope).await? else {
            return Ok(None);
        };

        let pre_encontro = sqlx::query_as::<_, PreEncontro>(
            "SELECT como_soube, facilidade_inscricao, comunicacao_previa, comentario \
             FROM pre_encontro WHERE avaliacao_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let palestras = sqlx::query_as::<_, Palestras>(
            "SELECT conteudo, clareza, duracao, palestrantes, palestra_destaque, comentario \
             FROM palestras WHERE avaliacao_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let ambientes = sqlx::query_as::<_, Ambientes>(
            "SELECT conforto, limpeza, acustica, climatizacao, comentario \
             FROM ambientes WHERE avaliacao_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let refeicoes = sqlx::query_as::<_, Refeicoes>(
            "SELECT qualidade, quantidade, variedade, atendimento, comentario \
             FROM refeicoes WHERE avaliacao_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let musicas = sqlx::query_as::<_, Musicas>(
            "SELECT selecao, execucao, volume, comentario FROM musicas WHERE avaliacao_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let equipe = sqlx::query_as::<_, Equipe>(
            "SELECT acolhimento, organizacao, pontualidade, disponibilidade, comentario \
             FROM equipe WHERE avaliacao_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let avaliacao_geral = sqlx::query_as::<_, AvaliacaoGeral>(
            "SELECT nota_geral, expectativas_atendidas, recomendaria, pontos_positivos, pontos_melhorar \
             FROM avaliacao_geral WHERE avaliacao_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let pastoral = sqlx::query_as::<_, InteressePastoral>(
            "SELECT interesse, nome_contato, telefone, email, areas_interesse, melhor_horario \
             FROM interesse_pastoral WHERE avaliacao_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let mensagem_final = sqlx::query_as::<_, MensagemFinal>(
            "SELECT mensagem, autoriza_divulgacao FROM mensagem_final WHERE avaliacao_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(Some(AvaliacaoDetail {
            id: avaliacao.id,
            encontro_id: avaliacao.encontro_id,
            pastoral_id: avaliacao.pastoral_id,
            nome_casal: avaliacao.nome_casal,
            created_at: avaliacao.created_at,
            pre_encontro,
            palestras,
            ambientes,
            refeicoes,
            musicas,
            equipe,
            avaliacao_geral,
            pastoral,
            mensagem_final,
        }))
    }

    /// Delete a response in scope; its sections cascade
    pub async fn delete(&self, id: i64, scope: Option<i64>) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM avaliacoes WHERE id = ?1 AND (?2 IS NULL OR pastoral_id = ?2)",
        )
        .bind(id)
        .bind(scope)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// One row of ratings per response, for the statistics computation
    pub async fn score_rows(
        &self,
        scope: Option<i64>,
        encontro_id: Option<i64>,
    ) -> Result<Vec<ScoreRow>, sqlx::Error> {
        let projection: Vec<String> = rating_columns()
            .map(|(section, field)| format!("{section}.{field}"))
            .collect();
        let joins: String = crate::avaliacoes::statistics::RATING_FIELDS
            .iter()
            .map(|(section, _)| {
                format!(" LEFT JOIN {section} ON {section}.avaliacao_id = a.id")
            })
            .collect();

        let sql = format!(
            "SELECT {}, avaliacao_geral.recomendaria, interesse_pastoral.interesse \
             FROM avaliacoes a{} \
             LEFT JOIN interesse_pastoral ON interesse_pastoral.avaliacao_id = a.id \
             WHERE (?1 IS NULL OR a.pastoral_id = ?1) AND (?2 IS NULL OR a.encontro_id = ?2)",
            projection.join(", "),
            joins
        );

        let rows = sqlx::query(&sql)
            .bind(scope)
            .bind(encontro_id)
            .fetch_all(&self.pool)
            .await?;

        let width = projection.len();
        rows.iter()
            .map(|row| {
                let ratings = (0..width)
                    .map(|i| row.try_get::<Option<i64>, _>(i))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ScoreRow {
                    ratings,
                    recomendaria: row.try_get(width)?,
                    interesse: row.try_get(width + 1)?,
                })
            })
            .collect()
    }

    /// Responses that declared interest in the pastoral
    pub async fn interessados(
        &self,
        scope: Option<i64>,
        encontro_id: Option<i64>,
    ) -> Result<Vec<Interessado>, sqlx::Error> {
        sqlx::query_as::<_, Interessado>(
            r#"
            SELECT a.id AS avaliacao_id, a.encontro_id, e.nome AS encontro_nome, a.nome_casal,
                   ip.nome_contato, ip.telefone, ip.email, ip.areas_interesse, ip.melhor_horario,
                   a.created_at
            FROM avaliacoes a
            JOIN interesse_pastoral ip ON ip.avaliacao_id = a.id
            LEFT JOIN encontros e ON e.id = a.encontro_id
            WHERE ip.interesse = 1
              AND (?1 IS NULL OR a.pastoral_id = ?1)
              AND (?2 IS NULL OR a.encontro_id = ?2)
            ORDER BY a.created_at DESC, a.id DESC
            "#,
        )
        .bind(scope)
        .bind(encontro_id)
        .fetch_all(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avaliacoes::models::fixtures::evaluation;
    use crate::db::create_memory_pool;

    #[tokio::test]
    async fn test_create_and_load_detail() {
        let pool = create_memory_pool().await.unwrap();
        let repo = AvaliacaoRepository::new(pool);

        let mut data = evaluation(4);
        data.pastoral.interesse = true;
        data.pastoral.telefone = Some("(11) 99999-0000".to_string());
        let id = repo.create(None, None, &data).await.unwrap();

        let detail = repo.find_detail(id, None).await.unwrap().unwrap();
        assert_eq!(detail.nome_casal.as_deref(), Some("João e Maria"));
        assert_eq!(detail.palestras.unwrap().clareza, 4);
        assert!(detail.avaliacao_geral.unwrap().recomendaria);
        assert!(detail.pastoral.unwrap().interesse);
    }

    #[tokio::test]
    async fn test_check_constraint_backs_up_validation() {
        let pool = create_memory_pool().await.unwrap();
        let repo = AvaliacaoRepository::new(pool.clone());

        let mut data = evaluation(4);
        data.musicas.volume = 9;
        let err = repo.create(None, None, &data).await.unwrap_err();
        assert!(err.to_string().contains("CHECK constraint failed"));

        // the transaction rolled back, leaving no orphan parent row
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM avaliacoes")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_score_rows_follow_projection() {
        let pool = create_memory_pool().await.unwrap();
        let repo = AvaliacaoRepository::new(pool);
        repo.create(None, None, &evaluation(3)).await.unwrap();
        repo.create(None, None, &evaluation(5)).await.unwrap();

        let rows = repo.score_rows(None, None).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ratings.len(), rating_columns().count());
        assert!(rows.iter().all(|r| r.recomendaria == Some(true)));
        assert!(rows.iter().all(|r| r.interesse == Some(false)));
    }

    #[tokio::test]
    async fn test_delete_cascades_sections() {
        let pool = create_memory_pool().await.unwrap();
        let repo = AvaliacaoRepository::new(pool.clone());
        let id = repo.create(None, None, &evaluation(2)).await.unwrap();

        assert!(repo.delete(id, None).await.unwrap());
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM palestras")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
