// Service layer for survey responses

use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;

use crate::avaliacoes::{
    models::{AvaliacaoDetail, AvaliacaoSummary, Contato, EvaluationData, Interessado},
    repository::AvaliacaoRepository,
    statistics::{self, Estatisticas},
};
use crate::email::{self, templates, EmailService};
use crate::encontros::{Encontro, EncontroRepository};
use crate::error::ApiError;
use crate::pastorais::repository::PastoralRepository;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 500;

pub struct AvaliacaoService {
    repository: AvaliacaoRepository,
    encontros: EncontroRepository,
    pastorais: PastoralRepository,
    email: Arc<dyn EmailService>,
}

impl AvaliacaoService {
    pub fn new(pool: SqlitePool, email: Arc<dyn EmailService>) -> Self {
        Self {
            repository: AvaliacaoRepository::new(pool.clone()),
            encontros: EncontroRepository::new(pool.clone()),
            pastorais: PastoralRepository::new(pool),
            email,
        }
    }

    /// Store a public survey submission
    ///
    /// This method:
    /// 1. Validates every section
    /// 2. Resolves the encontro from the access code or id
    /// 3. Inserts the response with the encontro's pastoral
    /// 4. Notifies the pastoral when the couple asked to be contacted
    pub async fn submit(&self, data: EvaluationData) -> Result<i64, ApiError> {
        // 1. Validate
        data.validate()?;

        // 2. Resolve encontro
        let encontro = self.resolve_encontro(&data).await?;
        let pastoral_id = encontro.as_ref().map(|e| e.pastoral_id);

        // 3. Insert
        let id = self
            .repository
            .create(encontro.as_ref().map(|e| e.id), pastoral_id, &data)
            .await?;
        tracing::info!(
            "Stored avaliacao {} (encontro={:?}, pastoral={:?})",
            id,
            encontro.as_ref().map(|e| e.id),
            pastoral_id
        );

        // 4. Notify
        if data.pastoral.interesse {
            self.notify_interest(pastoral_id, encontro.as_ref(), &data).await;
        }

        Ok(id)
    }

    async fn resolve_encontro(&self, data: &EvaluationData) -> Result<Option<Encontro>, ApiError> {
        let encontro = match (&data.codigo_acesso, data.encontro_id) {
            (Some(codigo), _) => self
                .encontros
                .find_by_codigo(codigo)
                .await?
                .ok_or_else(|| ApiError::not_found("Encontro", codigo))?,
            (None, Some(id)) => self
                .encontros
                .find_by_id(id, None)
                .await?
                .ok_or_else(|| ApiError::not_found("Encontro", id))?,
            (None, None) => return Ok(None),
        };

        let pastoral_active = self
            .pastorais
            .find_by_id(encontro.pastoral_id)
            .await?
            .map(|p| p.is_active)
            .unwrap_or(false);
        if !pastoral_active {
            return Err(ApiError::not_found("Encontro", encontro.id));
        }

        if !encontro.is_active {
            return Err(ApiError::BadRequest(
                "This encontro is no longer accepting responses".to_string(),
            ));
        }

        Ok(Some(encontro))
    }

    async fn notify_interest(
        &self,
        pastoral_id: Option<i64>,
        encontro: Option<&Encontro>,
        data: &EvaluationData,
    ) {
        let Some(pastoral_id) = pastoral_id else {
            return;
        };
        let pastoral = match self.pastorais.find_by_id(pastoral_id).await {
            Ok(Some(pastoral)) => pastoral,
            Ok(None) => return,
            Err(e) => {
                tracing::error!("Could not load pastoral {} for notification: {}", pastoral_id, e);
                return;
            }
        };
        let Some(to) = pastoral.email_contato else {
            return;
        };

        let message = templates::interest_notification(
            &to,
            encontro.map(|e| e.nome.as_str()),
            data.pastoral.nome_contato.as_deref(),
            data.pastoral.telefone.as_deref(),
            data.pastoral.email.as_deref(),
        );
        email::send_in_background(self.email.clone(), message);
    }

    pub async fn list(
        &self,
        scope: Option<i64>,
        encontro_id: Option<i64>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<AvaliacaoSummary>, ApiError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = offset.unwrap_or(0).max(0);
        Ok(self.repository.list(scope, encontro_id, limit, offset).await?)
    }

    pub async fn detail(&self, id: i64, scope: Option<i64>) -> Result<AvaliacaoDetail, ApiError> {
        self.repository
            .find_detail(id, scope)
            .await?
            .ok_or_else(|| ApiError::not_found("Avaliacao", id))
    }

    pub async fn delete(&self, id: i64, scope: Option<i64>) -> Result<(), ApiError> {
        if !self.repository.delete(id, scope).await? {
            return Err(ApiError::not_found("Avaliacao", id));
        }
        Ok(())
    }

    /// 404 when the encontro filter points outside the caller's scope
    async fn ensure_encontro_in_scope(
        &self,
        encontro_id: Option<i64>,
        scope: Option<i64>,
    ) -> Result<(), ApiError> {
        if let Some(id) = encontro_id {
            self.encontros
                .find_by_id(id, scope)
                .await?
                .ok_or_else(|| ApiError::not_found("Encontro", id))?;
        }
        Ok(())
    }

    pub async fn estatisticas(
        &self,
        scope: Option<i64>,
        encontro_id: Option<i64>,
    ) -> Result<Estatisticas, ApiError> {
        self.ensure_encontro_in_scope(encontro_id, scope).await?;
        let rows = self.repository.score_rows(scope, encontro_id).await?;
        Ok(statistics::compute(&rows))
    }

    pub async fn interessados(
        &self,
        scope: Option<i64>,
        encontro_id: Option<i64>,
    ) -> Result<Vec<Interessado>, ApiError> {
        self.ensure_encontro_in_scope(encontro_id, scope).await?;
        Ok(self.repository.interessados(scope, encontro_id).await?)
    }

    pub async fn contatos(&self, scope: Option<i64>) -> Result<Vec<Contato>, ApiError> {
        let interessados = self.repository.interessados(scope, None).await?;
        Ok(dedupe_contatos(&interessados))
    }
}

fn contact_key(email: Option<&str>, telefone: Option<&str>) -> Option<String> {
    if let Some(email) = email.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty()) {
        return Some(format!("email:{}", email));
    }
    telefone
        .map(|t| t.chars().filter(char::is_ascii_digit).collect::<String>())
        .filter(|digits| !digits.is_empty())
        .map(|digits| format!("tel:{}", digits))
}

/// Merge interested couples that share an email, or a phone number when no
/// email was given. Entries with neither are dropped. Newest data wins.
pub fn dedupe_contatos(interessados: &[Interessado]) -> Vec<Contato> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut contatos: Vec<Contato> = Vec::new();

    for item in interessados {
        let Some(key) = contact_key(item.email.as_deref(), item.telefone.as_deref()) else {
            continue;
        };

        match index.get(&key) {
            Some(&idx) => {
                let existing = &mut contatos[idx];
                existing.respostas += 1;
                if existing.nome.is_none() {
                    existing.nome = item.nome_contato.clone().or_else(|| item.nome_casal.clone());
                }
                if existing.telefone.is_none() {
                    existing.telefone = item.telefone.clone();
                }
                if existing.email.is_none() {
                    existing.email = item.email.clone();
                }
            }
            None => {
                index.insert(key, contatos.len());
                contatos.push(Contato {
                    nome: item.nome_contato.clone().or_else(|| item.nome_casal.clone()),
                    telefone: item.telefone.clone(),
                    email: item.email.clone(),
                    respostas: 1,
                });
            }
        }
    }

    contatos
}
