// HTTP handlers for pastoral (tenant) administration
// Mounted under /api/admin, super admins only

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use validator::Validate;

use crate::audit::{AuditAction, AuditEvent};
use crate::auth::middleware::{AuthenticatedUser, ClientIp};
use crate::error::{ApiError, ApiJson};
use crate::pastorais::{
    models::{BlockPastoralRequest, CreatePastoralRequest, Pastoral, UpdatePastoralRequest},
    repository::PastoralRepository,
};
use crate::AppState;

/// Handler for GET /api/admin/pastorais
#[utoipa::path(
    get,
    path = "/api/admin/pastorais",
    responses(
        (status = 200, description = "All pastorais", body = Vec<Pastoral>),
        (status = 403, description = "Super admin only")
    ),
    tag = "admin"
)]
pub async fn list_pastorais(State(state): State<AppState>) -> Result<Json<Vec<Pastoral>>, ApiError> {
    let pastorais = PastoralRepository::new(state.db.clone()).list().await?;
    Ok(Json(pastorais))
}

/// Handler for POST /api/admin/pastorais
#[utoipa::path(
    post,
    path = "/api/admin/pastorais",
    request_body = CreatePastoralRequest,
    responses(
        (status = 201, description = "Pastoral created", body = Pastoral),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Subdomain already in use")
    ),
    tag = "admin"
)]
pub async fn create_pastoral(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ClientIp(ip): ClientIp,
    ApiJson(request): ApiJson<CreatePastoralRequest>,
) -> Result<(StatusCode, Json<Pastoral>), ApiError> {
    request.validate()?;

    let pastoral = PastoralRepository::new(state.db.clone()).create(&request).await?;

    state
        .audit
        .log(
            AuditEvent::new(AuditAction::Create, "pastoral")
                .by(user.user_id)
                .entity_id(pastoral.id)
                .details(json!({ "nome": pastoral.nome, "subdomain": pastoral.subdomain }))
                .ip(&ip),
        )
        .await;

    tracing::info!("Created pastoral {} ({})", pastoral.id, pastoral.subdomain);
    Ok((StatusCode::CREATED, Json(pastoral)))
}

/// Handler for GET /api/admin/pastorais/:id
#[utoipa::path(
    get,
    path = "/api/admin/pastorais/{id}",
    params(("id" = i64, Path, description = "Pastoral ID")),
    responses(
        (status = 200, description = "Pastoral found", body = Pastoral),
        (status = 404, description = "Pastoral not found")
    ),
    tag = "admin"
)]
pub async fn get_pastoral(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Pastoral>, ApiError> {
    PastoralRepository::new(state.db.clone())
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Pastoral", id))
}

/// Handler for PUT /api/admin/pastorais/:id
#[utoipa::path(
    put,
    path = "/api/admin/pastorais/{id}",
    params(("id" = i64, Path, description = "Pastoral ID")),
    request_body = UpdatePastoralRequest,
    responses(
        (status = 200, description = "Pastoral updated", body = Pastoral),
        (status = 404, description = "Pastoral not found"),
        (status = 409, description = "Subdomain already in use")
    ),
    tag = "admin"
)]
pub async fn update_pastoral(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<UpdatePastoralRequest>,
) -> Result<Json<Pastoral>, ApiError> {
    request.validate()?;

    let pastoral = PastoralRepository::new(state.db.clone())
        .update(id, request)
        .await?
        .ok_or_else(|| ApiError::not_found("Pastoral", id))?;

    state
        .audit
        .log(
            AuditEvent::new(AuditAction::Update, "pastoral")
                .by(user.user_id)
                .entity_id(id)
                .ip(&ip),
        )
        .await;

    Ok(Json(pastoral))
}

/// Handler for DELETE /api/admin/pastorais/:id
/// Removes the pastoral with its users, encontros and avaliações
#[utoipa::path(
    delete,
    path = "/api/admin/pastorais/{id}",
    params(("id" = i64, Path, description = "Pastoral ID")),
    responses(
        (status = 204, description = "Pastoral deleted"),
        (status = 404, description = "Pastoral not found")
    ),
    tag = "admin"
)]
pub async fn delete_pastoral(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !PastoralRepository::new(state.db.clone()).delete(id).await? {
        return Err(ApiError::not_found("Pastoral", id));
    }

    state
        .audit
        .log(
            AuditEvent::new(AuditAction::Delete, "pastoral")
                .by(user.user_id)
                .entity_id(id)
                .ip(&ip),
        )
        .await;

    tracing::warn!("Deleted pastoral {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for POST /api/admin/pastorais/:id/block
#[utoipa::path(
    post,
    path = "/api/admin/pastorais/{id}/block",
    params(("id" = i64, Path, description = "Pastoral ID")),
    request_body = BlockPastoralRequest,
    responses(
        (status = 200, description = "Pastoral blocked", body = Pastoral),
        (status = 400, description = "Missing reason"),
        (status = 404, description = "Pastoral not found")
    ),
    tag = "admin"
)]
pub async fn block_pastoral(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<BlockPastoralRequest>,
) -> Result<Json<Pastoral>, ApiError> {
    request.validate()?;

    let pastoral = PastoralRepository::new(state.db.clone())
        .set_blocked(id, Some(&request.reason))
        .await?
        .ok_or_else(|| ApiError::not_found("Pastoral", id))?;

    state
        .audit
        .log(
            AuditEvent::new(AuditAction::Block, "pastoral")
                .by(user.user_id)
                .entity_id(id)
                .details(json!({ "reason": request.reason }))
                .ip(&ip),
        )
        .await;

    tracing::warn!("Blocked pastoral {}: {}", id, request.reason);
    Ok(Json(pastoral))
}

/// Handler for POST /api/admin/pastorais/:id/unblock
#[utoipa::path(
    post,
    path = "/api/admin/pastorais/{id}/unblock",
    params(("id" = i64, Path, description = "Pastoral ID")),
    responses(
        (status = 200, description = "Pastoral unblocked", body = Pastoral),
        (status = 404, description = "Pastoral not found")
    ),
    tag = "admin"
)]
pub async fn unblock_pastoral(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<i64>,
) -> Result<Json<Pastoral>, ApiError> {
    let pastoral = PastoralRepository::new(state.db.clone())
        .set_blocked(id, None)
        .await?
        .ok_or_else(|| ApiError::not_found("Pastoral", id))?;

    state
        .audit
        .log(
            AuditEvent::new(AuditAction::Unblock, "pastoral")
                .by(user.user_id)
                .entity_id(id)
                .ip(&ip),
        )
        .await;

    tracing::info!("Unblocked pastoral {}", id);
    Ok(Json(pastoral))
}
