// Encontros module
// Retreat events owned by a pastoral, with a public access code

pub mod handlers;
pub mod models;
pub mod repository;

use axum::{routing::get, Router};

use crate::AppState;

pub use models::{Encontro, EncontroPublico};
pub use repository::EncontroRepository;

/// Admin routes, scoped to the caller's pastoral
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/encontros",
            get(handlers::list_encontros).post(handlers::create_encontro),
        )
        .route(
            "/encontros/:id",
            get(handlers::get_encontro)
                .put(handlers::update_encontro)
                .delete(handlers::delete_encontro),
        )
}

/// Public lookup by access code
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/encontros/codigo/:codigo", get(handlers::get_encontro_by_codigo))
}
