mod api;
mod config;
mod database;
mod middleware;
mod models;
mod services;
mod state;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::middleware::IdentityGuard;
use crate::services::google_auth_service::{ServiceAccountKey, ServiceAccountTokenSource};
use crate::services::id_token_service::FirebaseTokenVerifier;
use crate::services::identity_service::FirebaseIdentityProvider;
use crate::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    log::info!("🚀 Starting Team Service...");
    log::info!("🔥 Firebase project: {}", config.firebase_project_id);

    // Initialize MongoDB connection
    let db = database::MongoDB::new(&config.database_url)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to connect to MongoDB: {}", e)))?;
    log::info!("✅ Connected to MongoDB");

    let service_account = match &config.google_credentials {
        Some(path) => Some(
            ServiceAccountKey::from_file(path)
                .and_then(ServiceAccountTokenSource::new)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?,
        ),
        None => None,
    };

    let state = web::Data::new(AppState::new(
        Arc::new(db.clone()),
        Arc::new(db),
        Arc::new(FirebaseIdentityProvider::new(&config, service_account)),
    ));

    let guard = if config.require_id_token {
        log::info!("🔐 ID token verification enabled");
        IdentityGuard::enabled(Arc::new(FirebaseTokenVerifier::new(&config.firebase_project_id)))
    } else {
        log::warn!("⚠️  ID token verification disabled, trusting uids sent in request bodies");
        IdentityGuard::disabled()
    };

    let cors_origins = config.cors_origins.clone();

    log::info!("🌐 Server running at http://{}:{}", config.host, config.port);
    log::info!("📚 Swagger UI: http://{}:{}/swagger-ui/", config.host, config.port);

    HttpServer::new(move || {
        let cors = cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .max_age(3600);

        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi)
            )
            .route("/health", web::get().to(api::health::health_check))
            .configure(api::configure(guard.clone()))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
