// CSRF protection using the double-submit cookie pattern
//
// The token lives in a signed cookie and must be echoed back in the
// `x-csrf-token` header on every state-changing admin request.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
    Json,
};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::error::AuthError;
use crate::AppState;

pub const CSRF_COOKIE: &str = "x-csrf-token";
pub const CSRF_HEADER: &str = "x-csrf-token";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

fn generate_csrf_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Handler for GET /api/csrf-token
/// Issues a fresh token in a signed cookie and returns it in the body
#[utoipa::path(
    get,
    path = "/api/csrf-token",
    responses(
        (status = 200, description = "CSRF token issued", body = CsrfTokenResponse)
    ),
    tag = "auth"
)]
pub async fn csrf_token_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> (SignedCookieJar, Json<CsrfTokenResponse>) {
    let token = generate_csrf_token();
    let cookie = csrf_cookie(token.clone(), state.config.is_production());

    tracing::debug!("Issued CSRF token");
    (jar.add(cookie), Json(CsrfTokenResponse { csrf_token: token }))
}

/// Same flags as the session cookies, so production sends it over HTTPS only
fn csrf_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((CSRF_COOKIE, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .build()
}

/// Middleware rejecting state-changing requests without a matching token pair
pub async fn csrf_protect(
    jar: SignedCookieJar,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if matches!(
        *request.method(),
        Method::GET | Method::HEAD | Method::OPTIONS
    ) {
        return Ok(next.run(request).await);
    }

    let header = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let cookie = jar.get(CSRF_COOKIE).map(|c| c.value().to_owned());

    match (header, cookie) {
        (Some(header), Some(cookie)) if constant_time_eq(header.as_bytes(), cookie.as_bytes()) => {
            Ok(next.run(request).await)
        }
        _ => {
            tracing::warn!(
                "CSRF check failed: {} {}",
                request.method(),
                request.uri().path()
            );
            Err(AuthError::CsrfMismatch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_random_hex() {
        let a = generate_csrf_token();
        let b = generate_csrf_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_csrf_cookie_secure_follows_environment() {
        let cookie = csrf_cookie("abc".to_string(), true);
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));

        let cookie = csrf_cookie("abc".to_string(), false);
        assert_ne!(cookie.secure(), Some(true));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }
}
