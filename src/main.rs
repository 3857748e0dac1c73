use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pastoral_avaliacoes::{
    auth::AuthService, config::Config, create_router, db, email, error, AppState,
};
use tracing_subscriber::EnvFilter;

/// Interval between purges of old login attempts and dead tokens
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

fn spawn_cleanup_task(auth_service: Arc<AuthService>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            match auth_service.cleanup().await {
                Ok(report) => tracing::info!(
                    "Cleanup removed {} login attempts, {} refresh tokens, {} reset tokens",
                    report.login_attempts,
                    report.refresh_tokens,
                    report.reset_tokens
                ),
                Err(e) => tracing::error!("Cleanup task failed: {}", e),
            }
        }
    });
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Pastoral Avaliações API - Starting...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    error::set_expose_internal_errors(!config.is_production());

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let email = email::provider_from_config(&config).expect("Failed to configure email provider");
    let addr = config.bind_address();
    let seed = config.super_admin_seed.clone();

    let state = AppState::new(pool, config, email);

    if let Some(seed) = seed {
        match state.auth_service.seed_super_admin(&seed).await {
            Ok(true) => tracing::info!("Initial super admin created"),
            Ok(false) => tracing::debug!("Super admin already present, seed skipped"),
            Err(e) => tracing::error!("Failed to seed super admin: {}", e),
        }
    }

    spawn_cleanup_task(state.auth_service.clone());

    let app = create_router(state);

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    // Peer addresses feed the rate limiters when no proxy header is present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
