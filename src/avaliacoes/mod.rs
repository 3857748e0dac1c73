// Avaliações module
// Survey submissions, admin listing, statistics and interested contacts

pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod statistics;

use axum::{
    routing::{get, post},
    Router,
};

use crate::rate_limit::{self, SUBMISSION};
use crate::AppState;

pub use service::AvaliacaoService;

/// Admin routes, scoped to the caller's pastoral
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/avaliacoes", get(handlers::list_avaliacoes))
        .route(
            "/avaliacoes/:id",
            get(handlers::get_avaliacao).delete(handlers::delete_avaliacao),
        )
        .route("/estatisticas", get(handlers::get_estatisticas))
        .route("/pastoral/interessados", get(handlers::list_interessados))
        .route("/pastoral/contatos", get(handlers::list_contatos))
}

/// The public survey form endpoint, behind its own limiter
pub fn public_routes() -> Router<AppState> {
    rate_limit::limit(
        Router::new().route("/avaliacoes", post(handlers::submit_avaliacao)),
        SUBMISSION,
    )
}
