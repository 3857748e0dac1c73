// Error handling module for the survey API
// Provides centralized error types and HTTP response conversion

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, warn};

/// Whether 500 responses may carry the internal error detail.
/// Switched off at startup in production.
static EXPOSE_INTERNAL_ERRORS: AtomicBool = AtomicBool::new(true);

pub fn set_expose_internal_errors(expose: bool) {
    EXPOSE_INTERNAL_ERRORS.store(expose, Ordering::Relaxed);
}

fn expose_internal_errors() -> bool {
    EXPOSE_INTERNAL_ERRORS.load(Ordering::Relaxed)
}

/// Main error type for the API
/// All handlers should return Result<T, ApiError>
#[derive(Debug)]
pub enum ApiError {
    /// Validation errors from request validation
    /// Maps to HTTP 400 Bad Request
    ValidationError(validator::ValidationErrors),

    /// Malformed or semantically invalid input
    /// Maps to HTTP 400 Bad Request
    BadRequest(String),

    /// Resource not found (or not visible to the caller's pastoral)
    /// Maps to HTTP 404 Not Found
    NotFound {
        resource: String,
        id: String,
    },

    /// Duplicate resource conflict
    /// Maps to HTTP 409 Conflict
    Conflict {
        message: String,
    },

    /// Too many attempts, optionally with a retry hint in seconds
    /// Maps to HTTP 429 Too Many Requests
    TooManyRequests {
        message: String,
        retry_after_secs: Option<u64>,
    },

    /// Database operation errors
    /// Maps to HTTP 500 Internal Server Error
    DatabaseError(sqlx::Error),

    /// Internal server errors
    /// Maps to HTTP 500 Internal Server Error
    InternalError(String),

    /// Authentication failures
    /// Maps to HTTP 401 Unauthorized
    Unauthorized(String),

    /// Authorization failures
    /// Maps to HTTP 403 Forbidden
    Forbidden(String),
}

/// Consistent error response structure
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "VALIDATION_ERROR", "NOT_FOUND")
    pub error_code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (e.g., field-level validation errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,

    /// ISO 8601 timestamp of when the error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_code: &str, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.to_string(),
            message: message.into(),
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let retry_after = match &self {
            ApiError::TooManyRequests { retry_after_secs, .. } => *retry_after_secs,
            _ => None,
        };

        let (status, error_response) = self.to_error_response();
        let mut response = (status, Json(error_response)).into_response();

        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

impl ApiError {
    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        ApiError::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    /// Convert ApiError to HTTP status code and ErrorResponse
    ///
    /// 500-level details are logged at error level and only echoed to the
    /// client when internal errors are exposed (non-production).
    fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
        match self {
            ApiError::ValidationError(errors) => {
                debug!("Validation error: {:?}", errors);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("VALIDATION_ERROR", "Request validation failed").with_details(
                        serde_json::to_value(errors).unwrap_or(serde_json::json!({})),
                    ),
                )
            }
            ApiError::BadRequest(message) => {
                debug!("Bad request: {}", message);
                (StatusCode::BAD_REQUEST, ErrorResponse::new("BAD_REQUEST", message.clone()))
            }
            ApiError::NotFound { resource, id } => {
                debug!("Resource not found: {} with id {}", resource, id);
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::new("NOT_FOUND", format!("{} with id {} not found", resource, id)),
                )
            }
            ApiError::Conflict { message } => {
                warn!("Conflict error: {}", message);
                (StatusCode::CONFLICT, ErrorResponse::new("CONFLICT", message.clone()))
            }
            ApiError::TooManyRequests { message, .. } => {
                warn!("Too many requests: {}", message);
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    ErrorResponse::new("TOO_MANY_REQUESTS", message.clone()),
                )
            }
            ApiError::DatabaseError(db_error) => {
                error!("Database error: {:?}", db_error);
                let mut response =
                    ErrorResponse::new("DATABASE_ERROR", "A database error occurred");
                if expose_internal_errors() {
                    response = response.with_details(serde_json::json!({ "debug": db_error.to_string() }));
                }
                (StatusCode::INTERNAL_SERVER_ERROR, response)
            }
            ApiError::InternalError(internal_msg) => {
                error!("Internal error: {}", internal_msg);
                let mut response =
                    ErrorResponse::new("INTERNAL_ERROR", "An internal server error occurred");
                if expose_internal_errors() {
                    response = response.with_details(serde_json::json!({ "debug": internal_msg }));
                }
                (StatusCode::INTERNAL_SERVER_ERROR, response)
            }
            ApiError::Unauthorized(message) => {
                warn!("Unauthorized access attempt: {}", message);
                (StatusCode::UNAUTHORIZED, ErrorResponse::new("UNAUTHORIZED", message.clone()))
            }
            ApiError::Forbidden(message) => {
                warn!("Forbidden access attempt: {}", message);
                (StatusCode::FORBIDDEN, ErrorResponse::new("FORBIDDEN", message.clone()))
            }
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

/// Classify a SQLite constraint failure by its message text.
///
/// Returns None when the message is not a constraint violation.
pub fn classify_constraint_violation(message: &str) -> Option<ApiError> {
    if message.contains("UNIQUE constraint failed") {
        let column = message
            .split("UNIQUE constraint failed:")
            .nth(1)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        let message = match column.as_str() {
            "users.email" => "Email already registered".to_string(),
            "pastorais.subdomain" => "Subdomain already in use".to_string(),
            "encontros.codigo_acesso" => "Access code already in use".to_string(),
            "" => "Resource already exists".to_string(),
            other => format!("Duplicate value for {}", other),
        };
        return Some(ApiError::Conflict { message });
    }
    if message.contains("FOREIGN KEY constraint failed") {
        return Some(ApiError::BadRequest("Referenced resource does not exist".to_string()));
    }
    if message.contains("CHECK constraint failed") {
        return Some(ApiError::BadRequest("A value is outside its allowed range".to_string()));
    }
    if message.contains("NOT NULL constraint failed") {
        return Some(ApiError::BadRequest("A required field is missing".to_string()));
    }
    None
}

/// Convert sqlx errors to ApiError, mapping constraint violations to 409/400
impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &error {
            if let Some(mapped) = classify_constraint_violation(db_err.message()) {
                return mapped;
            }
        }
        ApiError::DatabaseError(error)
    }
}

/// Convert validator errors to ApiError
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(errors)
    }
}

/// Bodies that are not JSON, or do not fit the target type, are a 400
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("Rejected JSON body: {}", rejection.body_text());
        let message = match rejection {
            JsonRejection::JsonDataError(e) => format!("Invalid request body: {}", e.body_text()),
            JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON".to_string(),
            JsonRejection::MissingJsonContentType(_) => {
                "Expected request with `Content-Type: application/json`".to_string()
            }
            other => other.body_text(),
        };
        ApiError::BadRequest(message)
    }
}

/// JSON body extractor whose rejection goes through ApiError
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// Any JWT failure reaching the API boundary is an authentication failure
impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        debug!("JWT error: {}", error);
        ApiError::Unauthorized("Invalid or expired token".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let err = classify_constraint_violation("UNIQUE constraint failed: users.email").unwrap();
        match err {
            ApiError::Conflict { message } => assert_eq!(message, "Email already registered"),
            other => panic!("Expected Conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_unique_column_still_conflict() {
        let err = classify_constraint_violation("UNIQUE constraint failed: foo.bar").unwrap();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_other_constraints_map_to_bad_request() {
        for msg in [
            "FOREIGN KEY constraint failed",
            "CHECK constraint failed: nota_geral BETWEEN 0 AND 5",
            "NOT NULL constraint failed: encontros.nome",
        ] {
            let err = classify_constraint_violation(msg).unwrap();
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST, "{}", msg);
        }
    }

    #[test]
    fn test_non_constraint_message_is_not_classified() {
        assert!(classify_constraint_violation("database is locked").is_none());
    }

    #[test]
    fn test_too_many_requests_sets_retry_after() {
        let response = ApiError::TooManyRequests {
            message: "slow down".to_string(),
            retry_after_secs: Some(900),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "900");
    }

    #[tokio::test]
    async fn test_json_type_mismatch_is_bad_request() {
        let req = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(r#"{"nota": 3.5}"#))
            .unwrap();

        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Nota {
            nota: u8,
        }

        let err = ApiJson::<Nota>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        match err {
            ApiError::BadRequest(message) => assert!(message.starts_with("Invalid request body")),
            other => panic!("Expected BadRequest, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_content_type_is_bad_request() {
        let req = Request::builder()
            .method("POST")
            .body(axum::body::Body::from("{}"))
            .unwrap();
        let err = ApiJson::<serde_json::Value>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_row_not_found_is_database_error() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
