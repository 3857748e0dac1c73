// Pastoral (tenant) models and DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::validation::SUBDOMAIN_RE;

/// Pastoral database model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Pastoral {
    pub id: i64,
    pub nome: String,
    pub subdomain: String,
    pub paroquia: Option<String>,
    pub cidade: Option<String>,
    pub email_contato: Option<String>,
    pub is_active: bool,
    pub blocked_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create pastoral request DTO
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePastoralRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub nome: String,
    #[validate(regex(
        path = "SUBDOMAIN_RE",
        message = "Subdomain must be 3-63 lowercase letters, digits or hyphens"
    ))]
    pub subdomain: String,
    #[validate(length(max = 200))]
    pub paroquia: Option<String>,
    #[validate(length(max = 100))]
    pub cidade: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email_contato: Option<String>,
}

/// Update pastoral request DTO; omitted fields are kept
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePastoralRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub nome: Option<String>,
    #[validate(regex(
        path = "SUBDOMAIN_RE",
        message = "Subdomain must be 3-63 lowercase letters, digits or hyphens"
    ))]
    pub subdomain: Option<String>,
    #[validate(length(max = 200))]
    pub paroquia: Option<String>,
    #[validate(length(max = 100))]
    pub cidade: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email_contato: Option<String>,
}

/// Block pastoral request DTO
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BlockPastoralRequest {
    #[validate(length(min = 1, max = 500, message = "A reason is required"))]
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_validates_subdomain() {
        let mut request = CreatePastoralRequest {
            nome: "Pastoral São José".to_string(),
            subdomain: "sao-jose".to_string(),
            paroquia: None,
            cidade: None,
            email_contato: Some("pastoral@example.com".to_string()),
        };
        assert!(request.validate().is_ok());

        request.subdomain = "São José".to_string();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_update_request_allows_empty_body() {
        let request: UpdatePastoralRequest = serde_json::from_str("{}").unwrap();
        assert!(request.validate().is_ok());
    }
}
