// Application configuration loaded from the environment

use std::env;
use thiserror::Error;

/// Minimum length accepted for COOKIE_SECRET (signed cookie key derivation)
pub const MIN_COOKIE_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Runtime environment, read from APP_ENV (or NODE_ENV)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "test" => Environment::Test,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Bootstrap credentials for the first super admin
#[derive(Debug, Clone)]
pub struct SuperAdminSeed {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub refresh_token_secret: String,
    pub cookie_secret: String,
    pub jwt_expires_in_days: i64,
    pub refresh_token_expires_in_days: i64,
    pub frontend_url: String,
    pub sendgrid_api_key: Option<String>,
    pub email_from: String,
    pub super_admin_seed: Option<SuperAdminSeed>,
}

impl Config {
    /// Load configuration from process environment variables.
    ///
    /// Call `dotenv::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = get("APP_ENV")
            .or_else(|| get("NODE_ENV"))
            .map(|v| Environment::parse(&v))
            .unwrap_or(Environment::Development);

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let refresh_token_secret =
            get("REFRESH_TOKEN_SECRET").ok_or(ConfigError::Missing("REFRESH_TOKEN_SECRET"))?;
        let cookie_secret = get("COOKIE_SECRET").ok_or(ConfigError::Missing("COOKIE_SECRET"))?;

        if cookie_secret.len() < MIN_COOKIE_SECRET_LEN {
            return Err(ConfigError::Invalid {
                name: "COOKIE_SECRET",
                reason: format!("must be at least {} bytes", MIN_COOKIE_SECRET_LEN),
            });
        }
        if jwt_secret == refresh_token_secret {
            return Err(ConfigError::Invalid {
                name: "REFRESH_TOKEN_SECRET",
                reason: "must differ from JWT_SECRET".to_string(),
            });
        }

        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?,
            None => 3001,
        };

        let jwt_expires_in_days = parse_days(get("JWT_EXPIRES_IN_DAYS"), "JWT_EXPIRES_IN_DAYS", 7)?;
        let refresh_token_expires_in_days = parse_days(
            get("REFRESH_TOKEN_EXPIRES_IN_DAYS"),
            "REFRESH_TOKEN_EXPIRES_IN_DAYS",
            30,
        )?;

        let super_admin_seed = match (get("SUPER_ADMIN_EMAIL"), get("SUPER_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(SuperAdminSeed { email, password }),
            _ => None,
        };

        Ok(Self {
            environment,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url: get("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://avaliacoes.db".to_string()),
            jwt_secret,
            refresh_token_secret,
            cookie_secret,
            jwt_expires_in_days,
            refresh_token_expires_in_days,
            frontend_url: get("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            sendgrid_api_key: get("SENDGRID_API_KEY"),
            email_from: get("EMAIL_FROM")
                .unwrap_or_else(|| "noreply@pastoralfamiliar.org".to_string()),
            super_admin_seed,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }

    /// Address the HTTP listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_days(raw: Option<String>, name: &'static str, default: i64) -> Result<i64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => {
            let days = value.parse::<i64>().map_err(|e| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            })?;
            if days <= 0 {
                return Err(ConfigError::Invalid {
                    name,
                    reason: "must be a positive number of days".to_string(),
                });
            }
            Ok(days)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("JWT_SECRET", "jwt-secret-for-tests"),
            ("REFRESH_TOKEN_SECRET", "refresh-secret-for-tests"),
            ("COOKIE_SECRET", "cookie-secret-for-tests-with-enough-bytes"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Config, ConfigError> {
        Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults_applied() {
        let config = load(&base_vars()).unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.database_url, "sqlite://avaliacoes.db");
        assert_eq!(config.jwt_expires_in_days, 7);
        assert_eq!(config.refresh_token_expires_in_days, 30);
        assert_eq!(config.environment, Environment::Development);
        assert!(config.sendgrid_api_key.is_none());
        assert!(config.super_admin_seed.is_none());
    }

    #[test]
    fn test_missing_jwt_secret() {
        let mut vars = base_vars();
        vars.remove("JWT_SECRET");
        assert!(matches!(load(&vars), Err(ConfigError::Missing("JWT_SECRET"))));
    }

    #[test]
    fn test_short_cookie_secret_rejected() {
        let mut vars = base_vars();
        vars.insert("COOKIE_SECRET", "too-short");
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { name: "COOKIE_SECRET", .. })
        ));
    }

    #[test]
    fn test_app_env_takes_precedence_over_node_env() {
        let mut vars = base_vars();
        vars.insert("NODE_ENV", "development");
        vars.insert("APP_ENV", "production");
        assert!(load(&vars).unwrap().is_production());

        vars.remove("APP_ENV");
        vars.insert("NODE_ENV", "production");
        assert!(load(&vars).unwrap().is_production());
    }

    #[test]
    fn test_invalid_port() {
        let mut vars = base_vars();
        vars.insert("PORT", "not-a-port");
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { name: "PORT", .. })));
    }

    #[test]
    fn test_zero_expiry_rejected() {
        let mut vars = base_vars();
        vars.insert("JWT_EXPIRES_IN_DAYS", "0");
        assert!(load(&vars).is_err());
    }
}
