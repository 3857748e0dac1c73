// JWT token generation and validation service

use crate::auth::{error::AuthError, models::Role};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,        // user_id
    pub email: String,
    pub role: Role,
    pub pastoral_id: Option<i64>,
    pub exp: i64,        // expiration timestamp
    pub iat: i64,        // issued at timestamp
}

/// Refresh token claims; `jti` makes every issued token unique
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: i64,
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

/// Freshly issued refresh token with its expiry
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Token service for JWT operations
///
/// Access and refresh tokens are signed with different secrets so one can
/// never be replayed as the other.
#[derive(Clone)]
pub struct TokenService {
    access_secret: String,
    refresh_secret: String,
    access_token_duration: i64,  // in seconds
    refresh_token_duration: i64, // in seconds
}

impl TokenService {
    /// Create a new TokenService.
    /// Durations are given in days (access defaults to 7, refresh to 30).
    pub fn new(
        access_secret: String,
        refresh_secret: String,
        access_days: i64,
        refresh_days: i64,
    ) -> Self {
        Self {
            access_secret,
            refresh_secret,
            access_token_duration: Duration::days(access_days).num_seconds(),
            refresh_token_duration: Duration::days(refresh_days).num_seconds(),
        }
    }

    pub fn access_token_duration(&self) -> i64 {
        self.access_token_duration
    }

    pub fn refresh_token_duration(&self) -> i64 {
        self.refresh_token_duration
    }

    /// Generate an access token
    pub fn generate_access_token(
        &self,
        user_id: i64,
        email: &str,
        role: Role,
        pastoral_id: Option<i64>,
    ) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();

        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role,
            pastoral_id,
            iat: now,
            exp: now + self.access_token_duration,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.access_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenGenerationError(e.to_string()))
    }

    /// Generate a refresh token
    pub fn generate_refresh_token(&self, user_id: i64) -> Result<IssuedRefreshToken, AuthError> {
        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.refresh_token_duration);

        let claims = RefreshClaims {
            sub: user_id,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.refresh_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenGenerationError(e.to_string()))?;

        Ok(IssuedRefreshToken { token, expires_at })
    }

    /// Validate an access token
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.access_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(map_jwt_error)
    }

    /// Validate a refresh token's signature and expiry
    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        decode::<RefreshClaims>(
            token,
            &DecodingKey::from_secret(self.refresh_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(map_jwt_error)
    }
}

fn map_jwt_error(e: jsonwebtoken::errors::Error) -> AuthError {
    match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        _ => AuthError::InvalidToken,
    }
}
