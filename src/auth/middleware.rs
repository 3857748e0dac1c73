// Authentication middleware and extractors for protected routes

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::convert::Infallible;
use std::net::SocketAddr;
use tracing::{debug, warn};

use crate::auth::{
    cookies::ACCESS_TOKEN_COOKIE, error::AuthError, models::Role, repository::UserRepository,
};
use crate::pastorais::repository::PastoralRepository;
use crate::AppState;

/// Authenticated user extractor for protected routes
///
/// The access token is read from the `accessToken` cookie, or from an
/// `Authorization: Bearer` header. The user row is reloaded on every request
/// so disabled accounts and blocked pastorais lose access immediately.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub email: String,
    pub nome: String,
    pub role: Role,
    pub pastoral_id: Option<i64>,
}

impl AuthenticatedUser {
    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    /// Pastoral the user is confined to; None means every pastoral
    pub fn pastoral_scope(&self) -> Option<i64> {
        match self.role {
            Role::SuperAdmin => None,
            Role::PastoralAdmin => self.pastoral_id,
        }
    }
}

fn extract_access_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(ACCESS_TOKEN_COOKIE) {
        if !cookie.value().is_empty() {
            return Ok(cookie.value().to_string());
        }
    }

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or(AuthError::InvalidToken)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_access_token(&parts.headers)?;
        let claims = state.auth_service.token_service().validate_access_token(&token)?;

        let user = UserRepository::new(state.db.clone())
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if !user.is_active {
            warn!("Token presented for disabled user_id={}", user.id);
            return Err(AuthError::InvalidToken);
        }

        if user.role == Role::PastoralAdmin {
            let pastoral_id = user.pastoral_id.ok_or(AuthError::InvalidToken)?;
            let pastoral = PastoralRepository::new(state.db.clone())
                .find_by_id(pastoral_id)
                .await?
                .ok_or(AuthError::InvalidToken)?;
            if !pastoral.is_active {
                warn!(
                    "Access refused for user_id={}: pastoral {} is blocked",
                    user.id, pastoral.id
                );
                return Err(AuthError::PastoralBlocked(pastoral.blocked_reason));
            }
        }

        Ok(AuthenticatedUser {
            user_id: user.id,
            email: user.email,
            nome: user.nome,
            role: user.role,
            pastoral_id: user.pastoral_id,
        })
    }
}

/// Client IP as seen through proxies
///
/// Uses the first X-Forwarded-For entry, then X-Real-IP, then the peer
/// address when the server was started with connect info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
    fn from_headers(headers: &HeaderMap) -> Option<String> {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        let real_ip = || {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        forwarded.or_else(real_ip).map(str::to_string)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = Self::from_headers(&parts.headers)
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string());

        Ok(ClientIp(ip))
    }
}

/// Authorization check that requires a specific role
#[derive(Debug, Clone)]
pub struct RequireRole {
    required_role: Role,
}

impl RequireRole {
    pub fn new(required_role: Role) -> Self {
        Self { required_role }
    }

    pub fn super_admin() -> Self {
        Self::new(Role::SuperAdmin)
    }

    pub fn check(&self, user: &AuthenticatedUser) -> Result<(), AuthError> {
        if user.role != self.required_role {
            return Err(AuthError::InsufficientPermissions {
                required: self.required_role,
                actual: user.role,
            });
        }
        Ok(())
    }
}

/// Middleware guarding the /api/admin routes
pub async fn require_super_admin(
    user: AuthenticatedUser,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let endpoint = request.uri().path().to_string();

    RequireRole::super_admin().check(&user).map_err(|e| {
        warn!(
            "Authorization failed: user_id={}, role={}, endpoint={}",
            user.user_id, user.role, endpoint
        );
        e
    })?;

    debug!(
        "Authorization successful: user_id={}, endpoint={}",
        user.user_id, endpoint
    );
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn user(role: Role, pastoral_id: Option<i64>) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: 1,
            email: "admin@example.com".to_string(),
            nome: "Admin".to_string(),
            role,
            pastoral_id,
        }
    }

    #[test]
    fn test_require_role_allows_matching_role() {
        assert!(RequireRole::super_admin().check(&user(Role::SuperAdmin, None)).is_ok());
    }

    #[test]
    fn test_require_role_denies_pastoral_admin() {
        let result = RequireRole::super_admin().check(&user(Role::PastoralAdmin, Some(3)));
        match result {
            Err(AuthError::InsufficientPermissions { required, actual }) => {
                assert_eq!(required, Role::SuperAdmin);
                assert_eq!(actual, Role::PastoralAdmin);
            }
            other => panic!("Expected InsufficientPermissions, got {:?}", other),
        }
    }

    #[test]
    fn test_pastoral_scope() {
        assert_eq!(user(Role::SuperAdmin, None).pastoral_scope(), None);
        assert_eq!(user(Role::PastoralAdmin, Some(3)).pastoral_scope(), Some(3));
    }

    #[test]
    fn test_token_from_cookie_takes_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("accessToken=from-cookie"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_access_token(&headers).unwrap(), "from-cookie");
    }

    #[test]
    fn test_token_from_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(extract_access_token(&headers).unwrap(), "abc");

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert!(matches!(extract_access_token(&headers), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_missing_token() {
        assert!(matches!(
            extract_access_token(&HeaderMap::new()),
            Err(AuthError::MissingToken)
        ));
    }

    #[test]
    fn test_client_ip_prefers_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(ClientIp::from_headers(&headers).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_client_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(ClientIp::from_headers(&headers).as_deref(), Some("10.0.0.2"));
        assert_eq!(ClientIp::from_headers(&HeaderMap::new()), None);
    }
}
