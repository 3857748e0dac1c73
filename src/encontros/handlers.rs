// HTTP handlers for encontro endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use validator::{Validate, ValidationErrors};

use crate::audit::{AuditAction, AuditEvent};
use crate::auth::middleware::{AuthenticatedUser, ClientIp};
use crate::encontros::{
    models::{CreateEncontroRequest, Encontro, EncontroPublico, UpdateEncontroRequest},
    repository::EncontroRepository,
};
use crate::error::{ApiError, ApiJson};
use crate::AppState;

/// Handler for GET /api/encontros
#[utoipa::path(
    get,
    path = "/api/encontros",
    responses(
        (status = 200, description = "Encontros visible to the caller", body = Vec<Encontro>),
        (status = 401, description = "Not authenticated")
    ),
    tag = "encontros"
)]
pub async fn list_encontros(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Encontro>>, ApiError> {
    let encontros = EncontroRepository::new(state.db.clone())
        .list(user.pastoral_scope())
        .await?;
    tracing::debug!("Retrieved {} encontros", encontros.len());
    Ok(Json(encontros))
}

/// Handler for POST /api/encontros
#[utoipa::path(
    post,
    path = "/api/encontros",
    request_body = CreateEncontroRequest,
    responses(
        (status = 201, description = "Encontro created", body = Encontro),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Missing CSRF token"),
        (status = 409, description = "Access code already in use")
    ),
    tag = "encontros"
)]
pub async fn create_encontro(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ClientIp(ip): ClientIp,
    ApiJson(request): ApiJson<CreateEncontroRequest>,
) -> Result<(StatusCode, Json<Encontro>), ApiError> {
    request.validate()?;

    let pastoral_id = match user.pastoral_scope() {
        Some(own) => own,
        None => request
            .pastoral_id
            .ok_or_else(|| ApiError::BadRequest("pastoral_id is required".to_string()))?,
    };

    let encontro = EncontroRepository::new(state.db.clone())
        .create(pastoral_id, &request)
        .await?;

    state
        .audit
        .log(
            AuditEvent::new(AuditAction::Create, "encontro")
                .by(user.user_id)
                .entity_id(encontro.id)
                .details(json!({ "nome": encontro.nome, "pastoral_id": pastoral_id }))
                .ip(&ip),
        )
        .await;

    tracing::info!("Created encontro {} for pastoral {}", encontro.id, pastoral_id);
    Ok((StatusCode::CREATED, Json(encontro)))
}

/// Handler for GET /api/encontros/:id
#[utoipa::path(
    get,
    path = "/api/encontros/{id}",
    params(("id" = i64, Path, description = "Encontro ID")),
    responses(
        (status = 200, description = "Encontro found", body = Encontro),
        (status = 404, description = "Not found in the caller's pastoral")
    ),
    tag = "encontros"
)]
pub async fn get_encontro(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Encontro>, ApiError> {
    EncontroRepository::new(state.db.clone())
        .find_by_id(id, user.pastoral_scope())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Encontro", id))
}

/// Handler for PUT /api/encontros/:id
#[utoipa::path(
    put,
    path = "/api/encontros/{id}",
    params(("id" = i64, Path, description = "Encontro ID")),
    request_body = UpdateEncontroRequest,
    responses(
        (status = 200, description = "Encontro updated", body = Encontro),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Not found in the caller's pastoral")
    ),
    tag = "encontros"
)]
pub async fn update_encontro(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<UpdateEncontroRequest>,
) -> Result<Json<Encontro>, ApiError> {
    request.validate()?;

    let repo = EncontroRepository::new(state.db.clone());
    let existing = repo
        .find_by_id(id, user.pastoral_scope())
        .await?
        .ok_or_else(|| ApiError::not_found("Encontro", id))?;

    if let Err(e) = request.merged_dates_valid(&existing) {
        let mut errors = ValidationErrors::new();
        errors.add("data_fim", e);
        return Err(ApiError::ValidationError(errors));
    }

    let encontro = repo.update(existing, request).await?;

    state
        .audit
        .log(
            AuditEvent::new(AuditAction::Update, "encontro")
                .by(user.user_id)
                .entity_id(encontro.id)
                .ip(&ip),
        )
        .await;

    Ok(Json(encontro))
}

/// Handler for DELETE /api/encontros/:id
/// Linked avaliações are kept with their encontro cleared
#[utoipa::path(
    delete,
    path = "/api/encontros/{id}",
    params(("id" = i64, Path, description = "Encontro ID")),
    responses(
        (status = 204, description = "Encontro deleted"),
        (status = 404, description = "Not found in the caller's pastoral")
    ),
    tag = "encontros"
)]
pub async fn delete_encontro(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let deleted = EncontroRepository::new(state.db.clone())
        .delete(id, user.pastoral_scope())
        .await?;

    if !deleted {
        return Err(ApiError::not_found("Encontro", id));
    }

    state
        .audit
        .log(
            AuditEvent::new(AuditAction::Delete, "encontro")
                .by(user.user_id)
                .entity_id(id)
                .ip(&ip),
        )
        .await;

    tracing::info!("Deleted encontro {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/encontros/codigo/:codigo
/// Public lookup used by the survey form
#[utoipa::path(
    get,
    path = "/api/encontros/codigo/{codigo}",
    params(("codigo" = String, Path, description = "Public access code")),
    responses(
        (status = 200, description = "Encontro accepting responses", body = EncontroPublico),
        (status = 404, description = "Unknown, inactive or blocked")
    ),
    tag = "encontros"
)]
pub async fn get_encontro_by_codigo(
    State(state): State<AppState>,
    Path(codigo): Path<String>,
) -> Result<Json<EncontroPublico>, ApiError> {
    EncontroRepository::new(state.db.clone())
        .find_public_by_codigo(&codigo)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Encontro", &codigo))
}
