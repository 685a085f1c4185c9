/// Builds a test service over the full `/api` route tree with the identity
/// guard disabled.
#[cfg(test)]
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($state))
                .configure(crate::api::configure(crate::middleware::IdentityGuard::disabled())),
        )
        .await
    };
}

#[cfg(test)]
pub(crate) use test_app;

pub mod auth;
pub mod health;
pub mod swagger;
pub mod teams;

use actix_web::{
    error::{InternalError, JsonPayloadError},
    http::StatusCode,
    web, HttpRequest, HttpResponse,
};
use serde::Serialize;

use crate::middleware::IdentityGuard;
use crate::utils::AppError;

/// Body of every plain message and error response
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

pub fn message_body(message: &str) -> MessageResponse {
    MessageResponse {
        message: message.to_string(),
    }
}

/// Maps a service error to its HTTP response and logs it.
///
/// Client errors carry their own message. Identity-provider and database
/// failures are logged in full and answered with `internal_message` only.
pub fn error_response(context: &str, err: &AppError, internal_message: &str) -> HttpResponse {
    let (status, message) = match err {
        AppError::Validation(msg) | AppError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
        AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.as_str()),
        AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.as_str()),
        AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.as_str()),
        AppError::Identity(_) | AppError::DatabaseError(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, internal_message)
        }
    };

    if status.is_server_error() {
        log::error!("❌ {} failed: {}", context, err);
    } else {
        log::warn!("⚠️ {} rejected: {}", context, err);
    }

    HttpResponse::build(status).json(message_body(message))
}

/// Rejects bodies that are not JSON or do not fit the request type with the
/// usual `{"message"}` body; the extractor detail only goes to the log.
fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    log::warn!("⚠️ {} {} - invalid JSON body: {}", req.method(), req.path(), err);
    let response = HttpResponse::BadRequest().json(message_body("Invalid request body"));
    InternalError::from_response(err, response).into()
}

/// Registers the `/api` routes behind the identity guard.
pub fn configure(guard: IdentityGuard) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.service(
            web::scope("/api")
                .wrap(guard)
                .app_data(web::JsonConfig::default().error_handler(json_error_handler))
                .route("/auth", web::post().to(auth::authenticate))
                .service(
                    web::scope("/teams")
                        .route("", web::post().to(teams::create_team))
                        .route("/join", web::post().to(teams::join_team))
                        .route("/{id}", web::put().to(teams::update_team))
                        .route("/{id}", web::delete().to(teams::delete_team))
                        .route("/{id}/users", web::get().to(teams::list_members)),
                ),
        );
    }
}
