// Survey response models and DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::validation::{blank_as_none, ACCESS_CODE_RE};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, FromRow, ToSchema)]
pub struct PreEncontro {
    #[validate(length(max = 200))]
    pub como_soube: Option<String>,
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub facilidade_inscricao: i64,
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub comunicacao_previa: i64,
    #[validate(length(max = 2000))]
    pub comentario: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, FromRow, ToSchema)]
pub struct Palestras {
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub conteudo: i64,
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub clareza: i64,
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub duracao: i64,
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub palestrantes: i64,
    #[validate(length(max = 200))]
    pub palestra_destaque: Option<String>,
    #[validate(length(max = 2000))]
    pub comentario: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, FromRow, ToSchema)]
pub struct Ambientes {
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub conforto: i64,
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub limpeza: i64,
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub acustica: i64,
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub climatizacao: i64,
    #[validate(length(max = 2000))]
    pub comentario: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, FromRow, ToSchema)]
pub struct Refeicoes {
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub qualidade: i64,
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub quantidade: i64,
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub variedade: i64,
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub atendimento: i64,
    #[validate(length(max = 2000))]
    pub comentario: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, FromRow, ToSchema)]
pub struct Musicas {
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub selecao: i64,
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub execucao: i64,
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub volume: i64,
    #[validate(length(max = 2000))]
    pub comentario: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, FromRow, ToSchema)]
pub struct Equipe {
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub acolhimento: i64,
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub organizacao: i64,
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub pontualidade: i64,
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub disponibilidade: i64,
    #[validate(length(max = 2000))]
    pub comentario: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, FromRow, ToSchema)]
pub struct AvaliacaoGeral {
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub nota_geral: i64,
    #[validate(range(min = 0, max = 5, message = "Rating must be between 0 and 5"))]
    pub expectativas_atendidas: i64,
    #[serde(default)]
    pub recomendaria: bool,
    #[validate(length(max = 2000))]
    pub pontos_positivos: Option<String>,
    #[validate(length(max = 2000))]
    pub pontos_melhorar: Option<String>,
}

/// Interest in joining the pastoral
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, FromRow, ToSchema)]
pub struct InteressePastoral {
    #[serde(default)]
    pub interesse: bool,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 200))]
    pub nome_contato: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 40))]
    pub telefone: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(max = 500))]
    pub areas_interesse: Option<String>,
    #[validate(length(max = 200))]
    pub melhor_horario: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, FromRow, ToSchema)]
pub struct MensagemFinal {
    #[validate(length(max = 5000))]
    pub mensagem: Option<String>,
    #[serde(default)]
    pub autoriza_divulgacao: bool,
}

/// Body of the public survey submission
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct EvaluationData {
    #[validate(length(max = 200))]
    pub nome_casal: Option<String>,
    /// Public access code of the encontro; takes precedence over `encontro_id`
    #[validate(regex(path = "ACCESS_CODE_RE", message = "Invalid access code"))]
    pub codigo_acesso: Option<String>,
    pub encontro_id: Option<i64>,
    #[validate]
    pub pre_encontro: PreEncontro,
    #[validate]
    pub palestras: Palestras,
    #[validate]
    pub ambientes: Ambientes,
    #[validate]
    pub refeicoes: Refeicoes,
    #[validate]
    pub musicas: Musicas,
    #[validate]
    pub equipe: Equipe,
    #[validate]
    pub avaliacao_geral: AvaliacaoGeral,
    #[serde(default)]
    #[validate]
    pub pastoral: InteressePastoral,
    #[serde(default)]
    #[validate]
    pub mensagem_final: MensagemFinal,
}

/// Parent row of a survey response
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Avaliacao {
    pub id: i64,
    pub encontro_id: Option<i64>,
    pub pastoral_id: Option<i64>,
    pub nome_casal: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// List item for the admin dashboard
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AvaliacaoSummary {
    pub id: i64,
    pub encontro_id: Option<i64>,
    pub encontro_nome: Option<String>,
    pub pastoral_id: Option<i64>,
    pub nome_casal: Option<String>,
    pub nota_geral: Option<i64>,
    pub recomendaria: Option<bool>,
    pub interesse_pastoral: Option<bool>,
    pub created_at: DateTime<Utc>,
}

/// A full response with every section
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AvaliacaoDetail {
    pub id: i64,
    pub encontro_id: Option<i64>,
    pub pastoral_id: Option<i64>,
    pub nome_casal: Option<String>,
    pub created_at: DateTime<Utc>,
    pub pre_encontro: Option<PreEncontro>,
    pub palestras: Option<Palestras>,
    pub ambientes: Option<Ambientes>,
    pub refeicoes: Option<Refeicoes>,
    pub musicas: Option<Musicas>,
    pub equipe: Option<Equipe>,
    pub avaliacao_geral: Option<AvaliacaoGeral>,
    pub pastoral: Option<InteressePastoral>,
    pub mensagem_final: Option<MensagemFinal>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitResponse {
    pub id: i64,
    pub message: String,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct ListAvaliacoesQuery {
    pub encontro_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct EncontroFilter {
    pub encontro_id: Option<i64>,
}

/// Couple who asked to be contacted by the pastoral
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Interessado {
    pub avaliacao_id: i64,
    pub encontro_id: Option<i64>,
    pub encontro_nome: Option<String>,
    pub nome_casal: Option<String>,
    pub nome_contato: Option<String>,
    pub telefone: Option<String>,
    pub email: Option<String>,
    pub areas_interesse: Option<String>,
    pub melhor_horario: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Contact entry deduplicated across responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Contato {
    pub nome: Option<String>,
    pub telefone: Option<String>,
    pub email: Option<String>,
    pub respostas: i64,
}
