// Request DTOs for user administration

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::auth::Role;
use crate::validation::validate_password_strength;

pub const DEFAULT_AUDIT_LIMIT: i64 = 100;
pub const MAX_AUDIT_LIMIT: i64 = 500;

/// A pastoral admin belongs to exactly one pastoral; a super admin to none
pub fn validate_role_assignment(role: Role, pastoral_id: Option<i64>) -> Result<(), ValidationError> {
    let message = match (role, pastoral_id) {
        (Role::PastoralAdmin, None) => "pastoral_admin users require a pastoral_id",
        (Role::SuperAdmin, Some(_)) => "super_admin users cannot belong to a pastoral",
        _ => return Ok(()),
    };
    let mut err = ValidationError::new("role_assignment");
    err.message = Some(message.into());
    Err(err)
}

fn validate_create_role(request: &CreateUserRequest) -> Result<(), ValidationError> {
    validate_role_assignment(request.role, request.pastoral_id)
}

/// Create user request DTO
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_create_role", skip_on_field_errors = false))]
pub struct CreateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub nome: String,
    #[validate(custom = "validate_password_strength")]
    pub password: String,
    pub role: Role,
    pub pastoral_id: Option<i64>,
}

/// Update user request DTO; omitted fields are kept
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub nome: Option<String>,
    pub role: Option<Role>,
    pub pastoral_id: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AuditLogQuery {
    /// Number of rows, newest first (default 100, max 500)
    pub limit: Option<i64>,
}

impl AuditLogQuery {
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_AUDIT_LIMIT)
            .clamp(1, MAX_AUDIT_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(role: Role, pastoral_id: Option<i64>) -> CreateUserRequest {
        CreateUserRequest {
            email: "admin@example.com".to_string(),
            nome: "Admin".to_string(),
            password: "Senha123".to_string(),
            role,
            pastoral_id,
        }
    }

    #[test]
    fn test_role_assignment_rules() {
        assert!(request(Role::PastoralAdmin, Some(1)).validate().is_ok());
        assert!(request(Role::SuperAdmin, None).validate().is_ok());
        assert!(request(Role::PastoralAdmin, None).validate().is_err());
        assert!(request(Role::SuperAdmin, Some(1)).validate().is_err());
    }

    #[test]
    fn test_weak_password_rejected() {
        let mut req = request(Role::SuperAdmin, None);
        req.password = "fraca".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_audit_limit_clamped() {
        assert_eq!(AuditLogQuery { limit: None }.effective_limit(), 100);
        assert_eq!(AuditLogQuery { limit: Some(10_000) }.effective_limit(), 500);
        assert_eq!(AuditLogQuery { limit: Some(0) }.effective_limit(), 1);
    }
}
