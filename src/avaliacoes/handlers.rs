// HTTP handlers for survey responses, statistics and contacts

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::audit::{AuditAction, AuditEvent};
use crate::auth::middleware::{AuthenticatedUser, ClientIp};
use crate::avaliacoes::{
    models::{
        AvaliacaoDetail, AvaliacaoSummary, Contato, EncontroFilter, EvaluationData, Interessado,
        ListAvaliacoesQuery, SubmitResponse,
    },
    statistics::Estatisticas,
};
use crate::error::{ApiError, ApiJson};
use crate::AppState;

/// Handler for POST /api/avaliacoes
/// Public survey submission
#[utoipa::path(
    post,
    path = "/api/avaliacoes",
    request_body = EvaluationData,
    responses(
        (status = 201, description = "Response stored", body = SubmitResponse),
        (status = 400, description = "Invalid ratings or closed encontro"),
        (status = 404, description = "Unknown access code"),
        (status = 429, description = "Too many submissions")
    ),
    tag = "avaliacoes"
)]
pub async fn submit_avaliacao(
    State(state): State<AppState>,
    ApiJson(data): ApiJson<EvaluationData>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let id = state.avaliacoes.submit(data).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            id,
            message: "Avaliação enviada com sucesso".to_string(),
        }),
    ))
}

/// Handler for GET /api/avaliacoes
#[utoipa::path(
    get,
    path = "/api/avaliacoes",
    params(ListAvaliacoesQuery),
    responses(
        (status = 200, description = "Responses visible to the caller", body = Vec<AvaliacaoSummary>),
        (status = 401, description = "Not authenticated")
    ),
    tag = "avaliacoes"
)]
pub async fn list_avaliacoes(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListAvaliacoesQuery>,
) -> Result<Json<Vec<AvaliacaoSummary>>, ApiError> {
    let avaliacoes = state
        .avaliacoes
        .list(user.pastoral_scope(), query.encontro_id, query.limit, query.offset)
        .await?;
    tracing::debug!("Retrieved {} avaliacoes", avaliacoes.len());
    Ok(Json(avaliacoes))
}

/// Handler for GET /api/avaliacoes/:id
#[utoipa::path(
    get,
    path = "/api/avaliacoes/{id}",
    params(("id" = i64, Path, description = "Avaliacao ID")),
    responses(
        (status = 200, description = "Full response", body = AvaliacaoDetail),
        (status = 404, description = "Not found in the caller's pastoral")
    ),
    tag = "avaliacoes"
)]
pub async fn get_avaliacao(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<AvaliacaoDetail>, ApiError> {
    Ok(Json(state.avaliacoes.detail(id, user.pastoral_scope()).await?))
}

/// Handler for DELETE /api/avaliacoes/:id
#[utoipa::path(
    delete,
    path = "/api/avaliacoes/{id}",
    params(("id" = i64, Path, description = "Avaliacao ID")),
    responses(
        (status = 204, description = "Response deleted"),
        (status = 403, description = "Missing CSRF token"),
        (status = 404, description = "Not found in the caller's pastoral")
    ),
    tag = "avaliacoes"
)]
pub async fn delete_avaliacao(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.avaliacoes.delete(id, user.pastoral_scope()).await?;

    state
        .audit
        .log(
            AuditEvent::new(AuditAction::Delete, "avaliacao")
                .by(user.user_id)
                .entity_id(id)
                .ip(&ip),
        )
        .await;

    tracing::info!("Deleted avaliacao {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/estatisticas
#[utoipa::path(
    get,
    path = "/api/estatisticas",
    params(EncontroFilter),
    responses(
        (status = 200, description = "Aggregated ratings", body = Estatisticas),
        (status = 404, description = "Encontro not found in the caller's pastoral")
    ),
    tag = "avaliacoes"
)]
pub async fn get_estatisticas(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filter): Query<EncontroFilter>,
) -> Result<Json<Estatisticas>, ApiError> {
    let stats = state
        .avaliacoes
        .estatisticas(user.pastoral_scope(), filter.encontro_id)
        .await?;
    Ok(Json(stats))
}

/// Handler for GET /api/pastoral/interessados
#[utoipa::path(
    get,
    path = "/api/pastoral/interessados",
    params(EncontroFilter),
    responses(
        (status = 200, description = "Couples interested in the pastoral", body = Vec<Interessado>)
    ),
    tag = "avaliacoes"
)]
pub async fn list_interessados(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filter): Query<EncontroFilter>,
) -> Result<Json<Vec<Interessado>>, ApiError> {
    let interessados = state
        .avaliacoes
        .interessados(user.pastoral_scope(), filter.encontro_id)
        .await?;
    Ok(Json(interessados))
}

/// Handler for GET /api/pastoral/contatos
#[utoipa::path(
    get,
    path = "/api/pastoral/contatos",
    responses(
        (status = 200, description = "Deduplicated contact list", body = Vec<Contato>)
    ),
    tag = "avaliacoes"
)]
pub async fn list_contatos(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Contato>>, ApiError> {
    Ok(Json(state.avaliacoes.contatos(user.pastoral_scope()).await?))
}
