// Super admin area: pastorais, users and the audit trail

pub mod handlers;
pub mod models;

use axum::{routing::get, Router};

use crate::AppState;

/// Routes nested under /api/admin; the caller adds the role guard
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/users/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/audit-logs", get(handlers::list_audit_logs))
        .merge(crate::pastorais::admin_routes())
}
