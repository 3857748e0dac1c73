// Authentication module
// JWT sessions in HttpOnly cookies, CSRF protection, login lockout and
// the password reset lifecycle

pub mod cookies;
pub mod csrf;
pub mod error;
pub mod handlers;
pub mod login_monitor;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod token;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::rate_limit;
use crate::AppState;

// Re-export commonly used types
pub use error::AuthError;
pub use middleware::{AuthenticatedUser, ClientIp, RequireRole};
pub use models::{Role, User, UserResponse};
pub use service::AuthService;
pub use token::TokenService;

/// Routes mounted under /api/auth
pub fn routes() -> Router<AppState> {
    let login = rate_limit::limit(
        Router::new().route("/login", post(handlers::login_handler)),
        rate_limit::LOGIN,
    );
    let refresh = rate_limit::limit(
        Router::new().route("/refresh", post(handlers::refresh_handler)),
        rate_limit::REFRESH,
    );
    let password_reset = rate_limit::limit(
        Router::new()
            .route("/forgot-password", post(handlers::forgot_password_handler))
            .route("/reset-password", post(handlers::reset_password_handler)),
        rate_limit::PASSWORD_RESET,
    );

    Router::new()
        .route("/logout", post(handlers::logout_handler))
        .route("/me", get(handlers::me_handler))
        .route("/change-password", put(handlers::change_password_handler))
        .merge(login)
        .merge(refresh)
        .merge(password_reset)
}
