// Encontro (retreat event) models and DTOs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::validation::ACCESS_CODE_RE;

/// Encontro database model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Encontro {
    pub id: i64,
    pub pastoral_id: i64,
    pub nome: String,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
    pub local: Option<String>,
    pub codigo_acesso: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What the public form may see about an encontro
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct EncontroPublico {
    pub id: i64,
    pub nome: String,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
    pub local: Option<String>,
    pub pastoral_nome: String,
}

fn validate_date_range(
    inicio: Option<NaiveDate>,
    fim: Option<NaiveDate>,
) -> Result<(), ValidationError> {
    if let (Some(inicio), Some(fim)) = (inicio, fim) {
        if fim < inicio {
            let mut err = ValidationError::new("date_range");
            err.message = Some("data_fim must not be before data_inicio".into());
            return Err(err);
        }
    }
    Ok(())
}

fn validate_create_dates(request: &CreateEncontroRequest) -> Result<(), ValidationError> {
    validate_date_range(request.data_inicio, request.data_fim)
}

/// Create encontro request DTO
///
/// `pastoral_id` is required for super admins and ignored for pastoral
/// admins, whose own pastoral is always used. A random access code is
/// generated when none is given.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_create_dates", skip_on_field_errors = false))]
pub struct CreateEncontroRequest {
    pub pastoral_id: Option<i64>,
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub nome: String,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
    #[validate(length(max = 200))]
    pub local: Option<String>,
    #[validate(regex(path = "ACCESS_CODE_RE", message = "Access code must be 4-32 letters, digits, '-' or '_'"))]
    pub codigo_acesso: Option<String>,
    pub is_active: Option<bool>,
}

/// Update encontro request DTO; omitted fields are kept
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateEncontroRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub nome: Option<String>,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
    #[validate(length(max = 200))]
    pub local: Option<String>,
    #[validate(regex(path = "ACCESS_CODE_RE", message = "Access code must be 4-32 letters, digits, '-' or '_'"))]
    pub codigo_acesso: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateEncontroRequest {
    /// Check the date range after merging with the stored values
    pub fn merged_dates_valid(&self, existing: &Encontro) -> Result<(), ValidationError> {
        validate_date_range(
            self.data_inicio.or(existing.data_inicio),
            self.data_fim.or(existing.data_fim),
        )
    }
}
