// HTTP handlers for authentication endpoints

use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use validator::Validate;

use crate::auth::{
    cookies::{self, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
    error::AuthError,
    middleware::{AuthenticatedUser, ClientIp},
    models::{
        AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest,
        MessageResponse, RefreshRequest, ResetPasswordRequest, UserResponse,
    },
    service::FORGOT_PASSWORD_MESSAGE,
};
use crate::error::{ApiError, ApiJson};
use crate::AppState;

/// Login a user
/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; tokens set as HttpOnly cookies", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account or pastoral disabled"),
        (status = 429, description = "Too many attempts")
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    jar: CookieJar,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    request.validate()?;

    let outcome = state
        .auth_service
        .login(&request.email, &request.password, &ip)
        .await?;

    let tokens = state.auth_service.token_service();
    let jar = cookies::set_session_cookies(
        jar,
        outcome.access_token,
        tokens.access_token_duration(),
        outcome.refresh.token,
        tokens.refresh_token_duration(),
        state.config.is_production(),
    );

    Ok((
        jar,
        Json(AuthResponse {
            message: "Login successful".to_string(),
            user: outcome.user.into(),
        }),
    ))
}

/// Refresh the access token
/// POST /api/auth/refresh
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body(content = RefreshRequest, description = "Only read when no refreshToken cookie is present"),
    responses(
        (status = 200, description = "New access token set as cookie", body = AuthResponse),
        (status = 400, description = "No refresh token supplied"),
        (status = 401, description = "Invalid, revoked or expired refresh token"),
        (status = 429, description = "Too many attempts")
    ),
    tag = "auth"
)]
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let from_cookie = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());
    let from_body = body
        .and_then(|Json(request)| request.refresh_token)
        .filter(|v| !v.is_empty());

    let refresh_token = from_cookie
        .or(from_body)
        .ok_or(AuthError::MissingRefreshToken)?;

    let (user, access_token) = state.auth_service.refresh(&refresh_token).await?;

    let jar = jar.add(cookies::auth_cookie(
        ACCESS_TOKEN_COOKIE,
        access_token,
        state.auth_service.token_service().access_token_duration(),
        state.config.is_production(),
    ));

    Ok((
        jar,
        Json(AuthResponse {
            message: "Token refreshed".to_string(),
            user: user.into(),
        }),
    ))
}

/// Logout, revoking the refresh token and clearing cookies
/// POST /api/auth/logout
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn logout_handler(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let refresh_token = jar.get(REFRESH_TOKEN_COOKIE).map(|c| c.value().to_string());

    if let Err(e) = state.auth_service.logout(refresh_token.as_deref(), &ip).await {
        tracing::error!("Failed to revoke refresh token on logout: {}", e);
    }

    (
        cookies::clear_session_cookies(jar, state.config.is_production()),
        Json(MessageResponse::new("Logout successful")),
    )
}

/// Request a password reset email
/// POST /api/auth/forgot-password
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Same response whether or not the email exists", body = MessageResponse),
        (status = 400, description = "Invalid email format"),
        (status = 429, description = "Too many requests")
    ),
    tag = "auth"
)]
pub async fn forgot_password_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    request.validate()?;

    if let Err(e) = state.auth_service.forgot_password(&request.email).await {
        tracing::error!("Password reset request failed: {}", e);
    }

    Ok(Json(MessageResponse::new(FORGOT_PASSWORD_MESSAGE)))
}

/// Set a new password using a reset token
/// POST /api/auth/reset-password
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Weak password or invalid token"),
        (status = 429, description = "Too many requests")
    ),
    tag = "auth"
)]
pub async fn reset_password_handler(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ApiJson(request): ApiJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    request.validate()?;

    state
        .auth_service
        .reset_password(&request.token, &request.password, &ip)
        .await?;

    Ok(Json(MessageResponse::new("Password has been reset")))
}

/// Get current user information
/// GET /api/auth/me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated")
    ),
    tag = "auth"
)]
pub async fn me_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.auth_service.current_user(user.user_id).await?;
    Ok(Json(user.into()))
}

/// Change the password of the logged-in user
/// PUT /api/auth/change-password
#[utoipa::path(
    put,
    path = "/api/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Weak password or wrong current password"),
        (status = 401, description = "Not authenticated")
    ),
    tag = "auth"
)]
pub async fn change_password_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ClientIp(ip): ClientIp,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    request.validate()?;

    state
        .auth_service
        .change_password(user.user_id, &request.current_password, &request.new_password, &ip)
        .await?;

    Ok(Json(MessageResponse::new("Password changed")))
}
