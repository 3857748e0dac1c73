// Validation utilities module
// Provides custom validation functions for domain-specific rules

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use validator::ValidationError;

/// Lowest and highest accepted survey rating
pub const RATING_MIN: i64 = 0;
pub const RATING_MAX: i64 = 5;

/// Minimum password length for admin accounts
pub const PASSWORD_MIN_LEN: usize = 8;

/// Subdomains: lowercase letters, digits and inner hyphens, 3 to 63 chars
pub static SUBDOMAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9](?:[a-z0-9-]{1,61}[a-z0-9])$").expect("valid regex"));

/// Public access codes: 4 to 32 letters, digits, '-' or '_'
pub static ACCESS_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{4,32}$").expect("valid regex"));

/// Validates password strength: minimum length plus upper, lower and digit
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        let mut err = ValidationError::new("password_too_short");
        err.message = Some("Password must be at least 8 characters".into());
        return Err(err);
    }
    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        let mut err = ValidationError::new("password_too_weak");
        err.message =
            Some("Password must contain upper case, lower case and numeric characters".into());
        return Err(err);
    }
    Ok(())
}

/// Normalizes an email address for lookups and storage
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Deserializes an optional text field, treating blank input as absent
///
/// Form fields left empty arrive as `""`; they must not trip format checks
/// such as `email` on a field the couple never filled in.
pub fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_strength() {
        assert!(validate_password_strength("Senha123").is_ok());
        assert!(validate_password_strength("short1A").is_err());
        assert!(validate_password_strength("alllowercase1").is_err());
        assert!(validate_password_strength("ALLUPPERCASE1").is_err());
        assert!(validate_password_strength("NoDigitsHere").is_err());
    }

    #[test]
    fn test_subdomain_pattern() {
        assert!(SUBDOMAIN_RE.is_match("sao-jose"));
        assert!(SUBDOMAIN_RE.is_match("paroquia123"));
        assert!(!SUBDOMAIN_RE.is_match("-bad"));
        assert!(!SUBDOMAIN_RE.is_match("Upper"));
        assert!(!SUBDOMAIN_RE.is_match("ab"));
    }

    #[test]
    fn test_access_code_pattern() {
        assert!(ACCESS_CODE_RE.is_match("ENC-2024_01"));
        assert!(!ACCESS_CODE_RE.is_match("abc"));
        assert!(!ACCESS_CODE_RE.is_match("has space"));
    }

    #[derive(Debug, serde::Deserialize)]
    struct Contact {
        #[serde(default, deserialize_with = "blank_as_none")]
        email: Option<String>,
    }

    #[test]
    fn test_blank_text_deserializes_as_none() {
        for body in [r#"{"email": ""}"#, r#"{"email": "   "}"#, r#"{"email": null}"#, "{}"] {
            let contact: Contact = serde_json::from_str(body).unwrap();
            assert_eq!(contact.email, None, "{}", body);
        }
        let contact: Contact = serde_json::from_str(r#"{"email": "casal@example.com"}"#).unwrap();
        assert_eq!(contact.email.as_deref(), Some("casal@example.com"));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Casal@Example.COM "), "casal@example.com");
    }
}
