// Pastoral Familiar survey API
//
// Couples answer an anonymous survey after an encontro; pastoral admins
// review the answers, statistics and interested contacts of their own
// pastoral, and super admins manage every pastoral and user.

pub mod admin;
pub mod audit;
pub mod auth;
pub mod avaliacoes;
pub mod config;
pub mod db;
pub mod email;
pub mod encontros;
pub mod error;
pub mod pastorais;
pub mod rate_limit;
pub mod validation;

use axum::{
    extract::{FromRef, State},
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use axum_extra::extract::cookie::Key;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::audit::AuditLogger;
use crate::auth::{csrf, middleware::require_super_admin, AuthService, TokenService};
use crate::avaliacoes::AvaliacaoService;
use crate::config::Config;
use crate::email::EmailService;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        csrf::csrf_token_handler,
        auth::handlers::login_handler,
        auth::handlers::refresh_handler,
        auth::handlers::logout_handler,
        auth::handlers::forgot_password_handler,
        auth::handlers::reset_password_handler,
        auth::handlers::me_handler,
        auth::handlers::change_password_handler,
        encontros::handlers::get_encontro_by_codigo,
        encontros::handlers::list_encontros,
        encontros::handlers::create_encontro,
        encontros::handlers::get_encontro,
        encontros::handlers::update_encontro,
        encontros::handlers::delete_encontro,
        avaliacoes::handlers::submit_avaliacao,
        avaliacoes::handlers::list_avaliacoes,
        avaliacoes::handlers::get_avaliacao,
        avaliacoes::handlers::delete_avaliacao,
        avaliacoes::handlers::get_estatisticas,
        avaliacoes::handlers::list_interessados,
        avaliacoes::handlers::list_contatos,
        pastorais::handlers::list_pastorais,
        pastorais::handlers::create_pastoral,
        pastorais::handlers::get_pastoral,
        pastorais::handlers::update_pastoral,
        pastorais::handlers::delete_pastoral,
        pastorais::handlers::block_pastoral,
        pastorais::handlers::unblock_pastoral,
        admin::handlers::list_users,
        admin::handlers::create_user,
        admin::handlers::get_user,
        admin::handlers::update_user,
        admin::handlers::delete_user,
        admin::handlers::list_audit_logs,
    ),
    components(
        schemas(
            HealthResponse,
            error::ErrorResponse,
            csrf::CsrfTokenResponse,
            auth::Role,
            auth::UserResponse,
            auth::models::LoginRequest,
            auth::models::RefreshRequest,
            auth::models::ForgotPasswordRequest,
            auth::models::ResetPasswordRequest,
            auth::models::ChangePasswordRequest,
            auth::models::AuthResponse,
            auth::models::MessageResponse,
            encontros::Encontro,
            encontros::EncontroPublico,
            encontros::models::CreateEncontroRequest,
            encontros::models::UpdateEncontroRequest,
            avaliacoes::models::EvaluationData,
            avaliacoes::models::PreEncontro,
            avaliacoes::models::Palestras,
            avaliacoes::models::Ambientes,
            avaliacoes::models::Refeicoes,
            avaliacoes::models::Musicas,
            avaliacoes::models::Equipe,
            avaliacoes::models::AvaliacaoGeral,
            avaliacoes::models::InteressePastoral,
            avaliacoes::models::MensagemFinal,
            avaliacoes::models::AvaliacaoSummary,
            avaliacoes::models::AvaliacaoDetail,
            avaliacoes::models::SubmitResponse,
            avaliacoes::models::Interessado,
            avaliacoes::models::Contato,
            avaliacoes::statistics::Estatisticas,
            pastorais::Pastoral,
            pastorais::models::CreatePastoralRequest,
            pastorais::models::UpdatePastoralRequest,
            pastorais::models::BlockPastoralRequest,
            admin::models::CreateUserRequest,
            admin::models::UpdateUserRequest,
            audit::AuditRecord,
        )
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "auth", description = "Sessions, CSRF and password lifecycle"),
        (name = "encontros", description = "Encontros of the caller's pastoral"),
        (name = "avaliacoes", description = "Survey responses, statistics and contacts"),
        (name = "admin", description = "Super admin management of pastorais, users and audit logs")
    ),
    info(
        title = "Pastoral Familiar - Avaliações API",
        version = "1.0.0",
        description = "Anonymous post-encontro surveys with a multi-tenant admin dashboard"
    )
)]
pub struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Config>,
    pub auth_service: Arc<AuthService>,
    pub avaliacoes: Arc<AvaliacaoService>,
    pub email: Arc<dyn EmailService>,
    pub audit: AuditLogger,
    pub cookie_key: Key,
}

impl AppState {
    /// Wire services over a migrated pool
    pub fn new(db: SqlitePool, config: Config, email: Arc<dyn EmailService>) -> Self {
        let audit = AuditLogger::new(db.clone());
        let tokens = TokenService::new(
            config.jwt_secret.clone(),
            config.refresh_token_secret.clone(),
            config.jwt_expires_in_days,
            config.refresh_token_expires_in_days,
        );
        let auth_service = AuthService::new(
            db.clone(),
            tokens,
            email.clone(),
            audit.clone(),
            config.frontend_url.clone(),
        );
        // Config guarantees COOKIE_SECRET is long enough to derive from
        let cookie_key = Key::derive_from(config.cookie_secret.as_bytes());

        Self {
            avaliacoes: Arc::new(AvaliacaoService::new(db.clone(), email.clone())),
            auth_service: Arc::new(auth_service),
            config: Arc::new(config),
            db,
            email,
            audit,
            cookie_key,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

/// Handler for GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::error!("Health check database query failed: {}", e);
            "unavailable"
        }
    };
    Json(HealthResponse { status: "ok", database })
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let origins: Vec<HeaderValue> = frontend_url
        .split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(csrf::CSRF_HEADER),
        ])
}

/// Creates and configures the application router
///
/// Admin routes that change state require the CSRF header; the public
/// form, the encontro lookup and /api/auth are exempt.
pub fn create_router(state: AppState) -> Router {
    let csrf_layer = middleware::from_fn_with_state(state.clone(), csrf::csrf_protect);

    let scoped = Router::new()
        .merge(encontros::routes())
        .merge(avaliacoes::routes())
        .layer(csrf_layer.clone());

    let super_admin = admin::routes()
        .layer(middleware::from_fn_with_state(state.clone(), require_super_admin))
        .layer(csrf_layer);

    let api = Router::new()
        .route("/health", get(health_check))
        .route("/csrf-token", get(csrf::csrf_token_handler))
        .nest("/auth", auth::routes())
        .nest("/admin", super_admin)
        .merge(scoped)
        .merge(encontros::public_routes())
        .merge(avaliacoes::public_routes());

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api)
        .layer(cors_layer(&state.config.frontend_url))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
