// Pastorais module
// Tenants of the system; each pastoral owns its admins and encontros

pub mod handlers;
pub mod models;
pub mod repository;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub use models::Pastoral;
pub use repository::PastoralRepository;

/// Super admin routes, nested under /api/admin
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/pastorais",
            get(handlers::list_pastorais).post(handlers::create_pastoral),
        )
        .route(
            "/pastorais/:id",
            get(handlers::get_pastoral)
                .put(handlers::update_pastoral)
                .delete(handlers::delete_pastoral),
        )
        .route("/pastorais/:id/block", post(handlers::block_pastoral))
        .route("/pastorais/:id/unblock", post(handlers::unblock_pastoral))
}
