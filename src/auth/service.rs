// Authentication service: login, session refresh and password lifecycle

use chrono::{Duration, Utc};
use rand::RngCore;
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::audit::{AuditAction, AuditEvent, AuditLogger};
use crate::auth::{
    error::AuthError,
    login_monitor::LoginMonitor,
    models::{Role, User},
    password::PasswordService,
    repository::{NewUser, PasswordResetRepository, TokenRepository, UserRepository},
    token::{IssuedRefreshToken, TokenService},
};
use crate::config::SuperAdminSeed;
use crate::email::{templates, EmailService};
use crate::pastorais::repository::PastoralRepository;
use crate::validation::normalize_email;

/// Reset links expire after one hour
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Response for forgot-password, identical whether or not the email exists
pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If the email is registered, a password reset link has been sent";

/// Tokens handed out on a successful login
#[derive(Debug)]
pub struct LoginOutcome {
    pub user: User,
    pub access_token: String,
    pub refresh: IssuedRefreshToken,
}

/// Rows removed by the periodic cleanup
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub login_attempts: u64,
    pub refresh_tokens: u64,
    pub reset_tokens: u64,
}

/// Service layer for authentication business logic
pub struct AuthService {
    users: UserRepository,
    pastorais: PastoralRepository,
    tokens: TokenRepository,
    resets: PasswordResetRepository,
    monitor: LoginMonitor,
    token_service: TokenService,
    email: Arc<dyn EmailService>,
    audit: AuditLogger,
    frontend_url: String,
}

fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl AuthService {
    pub fn new(
        pool: SqlitePool,
        token_service: TokenService,
        email: Arc<dyn EmailService>,
        audit: AuditLogger,
        frontend_url: String,
    ) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            pastorais: PastoralRepository::new(pool.clone()),
            tokens: TokenRepository::new(pool.clone()),
            resets: PasswordResetRepository::new(pool.clone()),
            monitor: LoginMonitor::new(pool),
            token_service,
            email,
            audit,
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn token_service(&self) -> &TokenService {
        &self.token_service
    }

    /// Authenticate with email and password
    ///
    /// This method:
    /// 1. Refuses the attempt if the IP or email is locked out
    /// 2. Verifies the credentials, recording the outcome
    /// 3. Checks the account and its pastoral are active
    /// 4. Issues an access token and a stored refresh token
    pub async fn login(&self, email: &str, password: &str, ip: &str) -> Result<LoginOutcome, AuthError> {
        let email = normalize_email(email);

        // 1. Lockout check
        self.monitor.check(ip, &email).await?;

        // 2. Credentials
        let user = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                PasswordService::verify_against_dummy_async(password.to_string()).await;
                self.monitor.record(ip, &email, false).await?;
                tracing::debug!("Login failed: unknown email {}", email);
                return Err(AuthError::InvalidCredentials);
            }
        };

        let valid =
            PasswordService::verify_password_async(password.to_string(), user.password_hash.clone())
                .await?;
        if !valid {
            self.monitor.record(ip, &email, false).await?;
            tracing::debug!("Login failed: wrong password for user_id={}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        // 3. Account state
        if !user.is_active {
            self.monitor.record(ip, &email, false).await?;
            return Err(AuthError::AccountDisabled);
        }
        self.ensure_pastoral_active(&user).await?;

        self.monitor.record(ip, &email, true).await?;
        self.users.touch_last_login(user.id).await?;

        // 4. Tokens
        let access_token = self.token_service.generate_access_token(
            user.id,
            &user.email,
            user.role,
            user.pastoral_id,
        )?;
        let refresh = self.token_service.generate_refresh_token(user.id)?;
        self.tokens
            .store_refresh_token(user.id, &refresh.token, refresh.expires_at)
            .await?;

        self.audit
            .log(AuditEvent::new(AuditAction::Login, "user").by(user.id).entity_id(user.id).ip(ip))
            .await;
        tracing::info!("User {} logged in", user.id);

        Ok(LoginOutcome { user, access_token, refresh })
    }

    async fn ensure_pastoral_active(&self, user: &User) -> Result<(), AuthError> {
        if user.role != Role::PastoralAdmin {
            return Ok(());
        }
        let pastoral_id = user.pastoral_id.ok_or(AuthError::InvalidCredentials)?;
        match self.pastorais.find_by_id(pastoral_id).await? {
            Some(pastoral) if pastoral.is_active => Ok(()),
            Some(pastoral) => Err(AuthError::PastoralBlocked(pastoral.blocked_reason)),
            None => Err(AuthError::PastoralBlocked(None)),
        }
    }

    /// Exchange a refresh token for a new access token
    pub async fn refresh(&self, refresh_token: &str) -> Result<(User, String), AuthError> {
        let claims = self.token_service.validate_refresh_token(refresh_token)?;

        let stored = self
            .tokens
            .find_active(refresh_token)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if stored.user_id != claims.sub {
            return Err(AuthError::InvalidToken);
        }

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AuthError::InvalidToken)?;
        self.ensure_pastoral_active(&user).await?;

        let access_token = self.token_service.generate_access_token(
            user.id,
            &user.email,
            user.role,
            user.pastoral_id,
        )?;

        tracing::debug!("Access token refreshed for user_id={}", user.id);
        Ok((user, access_token))
    }

    /// Revoke the refresh token if one was presented
    pub async fn logout(&self, refresh_token: Option<&str>, ip: &str) -> Result<(), AuthError> {
        let Some(token) = refresh_token.filter(|t| !t.is_empty()) else {
            return Ok(());
        };

        self.tokens.revoke(token).await?;

        if let Ok(claims) = self.token_service.validate_refresh_token(token) {
            self.audit
                .log(AuditEvent::new(AuditAction::Logout, "user").by(claims.sub).entity_id(claims.sub).ip(ip))
                .await;
        }
        Ok(())
    }

    /// Start a password reset; the outcome is never revealed to the caller
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);

        let user = match self.users.find_by_email(&email).await? {
            Some(user) if user.is_active => user,
            _ => {
                tracing::debug!("Password reset requested for unknown or disabled account");
                return Ok(());
            }
        };

        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.resets.create(user.id, &token, expires_at).await?;

        let link = format!("{}/reset-password?token={}", self.frontend_url, token);
        if let Err(e) = self.email.send(templates::password_reset(&user.email, &link)).await {
            tracing::error!("Failed to send password reset email to user_id={}: {}", user.id, e);
        }

        tracing::info!("Password reset token issued for user_id={}", user.id);
        Ok(())
    }

    /// Complete a password reset
    ///
    /// This method:
    /// 1. Looks up an unused, unexpired token
    /// 2. Consumes it so it cannot be replayed
    /// 3. Stores the new password hash
    /// 4. Revokes every refresh token of the user
    pub async fn reset_password(&self, token: &str, new_password: &str, ip: &str) -> Result<(), AuthError> {
        // 1. Token lookup
        let reset = self
            .resets
            .find_valid(token)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        // 2. Single use
        if !self.resets.mark_used(reset.id).await? {
            return Err(AuthError::InvalidResetToken);
        }

        // 3. New password
        let hash = PasswordService::hash_password_async(new_password.to_string()).await?;
        self.users.set_password(reset.user_id, &hash).await?;

        // 4. End existing sessions
        let revoked = self.tokens.revoke_all_for_user(reset.user_id).await?;

        self.audit
            .log(
                AuditEvent::new(AuditAction::PasswordReset, "user")
                    .by(reset.user_id)
                    .entity_id(reset.user_id)
                    .details(json!({ "revoked_sessions": revoked }))
                    .ip(ip),
            )
            .await;
        tracing::info!("Password reset completed for user_id={}", reset.user_id);
        Ok(())
    }

    /// Change the password of a logged-in user
    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
        ip: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let matches = PasswordService::verify_password_async(
            current_password.to_string(),
            user.password_hash.clone(),
        )
        .await?;
        if !matches {
            return Err(AuthError::IncorrectPassword);
        }

        let hash = PasswordService::hash_password_async(new_password.to_string()).await?;
        self.users.set_password(user.id, &hash).await?;

        self.audit
            .log(AuditEvent::new(AuditAction::PasswordChange, "user").by(user.id).entity_id(user.id).ip(ip))
            .await;
        Ok(())
    }

    pub async fn current_user(&self, user_id: i64) -> Result<User, AuthError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    /// Create the first super admin when none exists yet
    pub async fn seed_super_admin(&self, seed: &SuperAdminSeed) -> Result<bool, AuthError> {
        if self.users.count_active_super_admins().await? > 0 {
            return Ok(false);
        }

        let email = normalize_email(&seed.email);
        if self.users.find_by_email(&email).await?.is_some() {
            tracing::warn!("Seed super admin {} exists but is not an active super admin", email);
            return Ok(false);
        }

        let hash = PasswordService::hash_password_async(seed.password.clone()).await?;
        let user = self
            .users
            .create_user(NewUser {
                email: &email,
                password_hash: &hash,
                nome: "Super Admin",
                role: Role::SuperAdmin,
                pastoral_id: None,
            })
            .await?;

        tracing::info!("Seeded super admin user_id={}", user.id);
        Ok(true)
    }

    /// Purge old login attempts and dead tokens
    pub async fn cleanup(&self) -> Result<CleanupReport, sqlx::Error> {
        Ok(CleanupReport {
            login_attempts: self.monitor.cleanup().await?,
            refresh_tokens: self.tokens.delete_stale_tokens().await?,
            reset_tokens: self.resets.delete_stale_tokens().await?,
        })
    }
}
