// HTTP handlers for user administration and the audit trail
// Mounted under /api/admin, super admins only

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use validator::{Validate, ValidationErrors};

use crate::admin::models::{
    validate_role_assignment, AuditLogQuery, CreateUserRequest, UpdateUserRequest,
};
use crate::audit::{AuditAction, AuditEvent, AuditRecord};
use crate::auth::{
    middleware::{AuthenticatedUser, ClientIp},
    password::PasswordService,
    repository::{NewUser, UserChanges, UserRepository},
    Role, UserResponse,
};
use crate::email::{self, templates};
use crate::error::{ApiError, ApiJson};
use crate::validation::normalize_email;
use crate::AppState;

/// Handler for GET /api/admin/users
#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "All admin users", body = Vec<UserResponse>),
        (status = 403, description = "Super admin only")
    ),
    tag = "admin"
)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = UserRepository::new(state.db.clone()).list(None).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Handler for POST /api/admin/users
///
/// This handler:
/// 1. Validates the request, including the role/pastoral pairing
/// 2. Hashes the password off the async runtime
/// 3. Inserts the user (409 on a duplicate email)
/// 4. Sends a welcome email in the background
#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid input or unknown pastoral"),
        (status = 409, description = "Email already registered")
    ),
    tag = "admin"
)]
pub async fn create_user(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    ClientIp(ip): ClientIp,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    request.validate()?;

    let email = normalize_email(&request.email);
    let hash = PasswordService::hash_password_async(request.password).await?;

    let user = UserRepository::new(state.db.clone())
        .create_user(NewUser {
            email: &email,
            password_hash: &hash,
            nome: &request.nome,
            role: request.role,
            pastoral_id: request.pastoral_id,
        })
        .await?;

    state
        .audit
        .log(
            AuditEvent::new(AuditAction::Create, "user")
                .by(admin.user_id)
                .entity_id(user.id)
                .details(json!({ "email": user.email, "role": user.role.as_str() }))
                .ip(&ip),
        )
        .await;

    let login_url = format!("{}/login", state.config.frontend_url.trim_end_matches('/'));
    email::send_in_background(
        state.email.clone(),
        templates::welcome(&user.email, &user.nome, &login_url),
    );

    tracing::info!("Created user {} with role {}", user.id, user.role);
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Handler for GET /api/admin/users/:id
#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "User not found")
    ),
    tag = "admin"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    UserRepository::new(state.db.clone())
        .find_by_id(id)
        .await?
        .map(|user| Json(user.into()))
        .ok_or_else(|| ApiError::not_found("User", id))
}

/// Handler for PUT /api/admin/users/:id
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already registered or last super admin")
    ),
    tag = "admin"
)]
pub async fn update_user(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    request.validate()?;

    let users = UserRepository::new(state.db.clone());
    let existing = users
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    let role = request.role.unwrap_or(existing.role);
    let pastoral_id = match role {
        Role::SuperAdmin => None,
        Role::PastoralAdmin => request.pastoral_id.or(existing.pastoral_id),
    };
    if let Err(e) = validate_role_assignment(role, pastoral_id) {
        let mut errors = ValidationErrors::new();
        errors.add("pastoral_id", e);
        return Err(ApiError::ValidationError(errors));
    }

    let loses_super_admin = existing.role == Role::SuperAdmin
        && existing.is_active
        && (role != Role::SuperAdmin || request.is_active == Some(false));
    if loses_super_admin && users.count_active_super_admins().await? <= 1 {
        return Err(ApiError::Conflict {
            message: "Cannot demote or disable the last active super admin".to_string(),
        });
    }

    let user = users
        .update(
            id,
            UserChanges {
                email: request.email.as_deref().map(normalize_email),
                nome: request.nome,
                role: Some(role),
                pastoral_id: Some(pastoral_id),
                is_active: request.is_active,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    state
        .audit
        .log(
            AuditEvent::new(AuditAction::Update, "user")
                .by(admin.user_id)
                .entity_id(id)
                .details(json!({ "role": user.role.as_str(), "is_active": user.is_active }))
                .ip(&ip),
        )
        .await;

    Ok(Json(user.into()))
}

/// Handler for DELETE /api/admin/users/:id
#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Cannot delete yourself"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Last active super admin")
    ),
    tag = "admin"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if id == admin.user_id {
        return Err(ApiError::BadRequest("You cannot delete your own account".to_string()));
    }

    let users = UserRepository::new(state.db.clone());
    let existing = users
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    if existing.role == Role::SuperAdmin
        && existing.is_active
        && users.count_active_super_admins().await? <= 1
    {
        return Err(ApiError::Conflict {
            message: "Cannot delete the last active super admin".to_string(),
        });
    }

    users.delete(id).await?;

    state
        .audit
        .log(
            AuditEvent::new(AuditAction::Delete, "user")
                .by(admin.user_id)
                .entity_id(id)
                .details(json!({ "email": existing.email }))
                .ip(&ip),
        )
        .await;

    tracing::info!("Deleted user {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/admin/audit-logs
#[utoipa::path(
    get,
    path = "/api/admin/audit-logs",
    params(AuditLogQuery),
    responses(
        (status = 200, description = "Newest audit rows first", body = Vec<AuditRecord>),
        (status = 403, description = "Super admin only")
    ),
    tag = "admin"
)]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<Vec<AuditRecord>>, ApiError> {
    let records = state.audit.list_recent(query.effective_limit()).await?;
    Ok(Json(records))
}
