use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use super::message_body;
use crate::middleware::auth::caller_uid;
use crate::models::UserResponse;
use crate::services::auth_service;
use crate::state::AppState;
use crate::utils::{present, AppError};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AuthRequest {
    /// External identity identifier
    pub uid: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub message: String,
    pub user: UserResponse,
}

/// POST /api/auth - find-or-create the local user for an external identity
#[utoipa::path(
    post,
    path = "/api/auth",
    tag = "Auth",
    request_body = AuthRequest,
    responses(
        (status = 200, description = "Authentication successful", body = AuthResponse),
        (status = 400, description = "Missing uid, first name or last name", body = super::MessageResponse),
        (status = 401, description = "Identity lookup or user sync failed", body = super::MessageResponse)
    )
)]
pub async fn authenticate(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<AuthRequest>,
) -> HttpResponse {
    log::info!("🔐 POST /api/auth - uid: {}", body.uid.as_deref().unwrap_or("N/A"));

    let uid = match caller_uid(&req, present(&body.uid)) {
        Ok(uid) => uid,
        Err(e) => return super::error_response("Authentication", &e, "Invalid token"),
    };

    let (Some(uid), Some(first_name), Some(last_name)) =
        (uid, present(&body.firstname), present(&body.lastname))
    else {
        log::warn!("⚠️ Authentication rejected: missing fields");
        return HttpResponse::BadRequest()
            .json(message_body("UID, first name, and last name are required"));
    };

    match auth_service::find_or_create_user(&state, &uid, first_name, last_name).await {
        Ok(user) => {
            log::info!("✅ Authentication successful: {}", uid);
            HttpResponse::Ok().json(AuthResponse {
                message: "Authentication successful".to_string(),
                user: UserResponse::from(user),
            })
        }
        Err(e) => {
            match &e {
                AppError::DatabaseError(_) => log::error!("❌ Authentication failed: {} - {}", uid, e),
                _ => log::warn!("❌ Authentication failed: {} - {}", uid, e),
            }
            HttpResponse::Unauthorized().json(message_body("Invalid token"))
        }
    }
}
