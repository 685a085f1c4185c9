use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use super::{error_response, message_body, MessageResponse};
use crate::middleware::auth::caller_uid;
use crate::models::{TeamResponse, UserResponse};
use crate::services::team_service;
use crate::state::AppState;
use crate::utils::{present, present_trimmed, AppError};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    pub name: Option<String>,
    /// External identity identifier of the admin
    pub admin_uid: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateTeamRequest {
    /// Requester's external identity identifier
    pub uid: Option<String>,
    /// New team name; omitted means save without renaming
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinTeamRequest {
    pub join_token: Option<String>,
    pub uid: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamResponse {
    pub team: TeamResponse,
    /// Equal to the team's `_id`
    pub join_token: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TeamEnvelope {
    pub team: TeamResponse,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TeamMembersResponse {
    pub users: Vec<UserResponse>,
}

/// Claimed uid after reconciling it with a verified token, if any
fn resolve_caller(req: &HttpRequest, claimed: &Option<String>) -> Result<Option<String>, AppError> {
    caller_uid(req, present(claimed))
}

/// POST /api/teams - create a team; the admin becomes its first member
#[utoipa::path(
    post,
    path = "/api/teams",
    tag = "Teams",
    request_body = CreateTeamRequest,
    responses(
        (status = 201, description = "Team created", body = CreateTeamResponse),
        (status = 400, description = "Missing name or adminUid", body = MessageResponse),
        (status = 404, description = "Admin not found", body = MessageResponse),
        (status = 500, description = "Store error", body = MessageResponse)
    )
)]
pub async fn create_team(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CreateTeamRequest>,
) -> HttpResponse {
    log::info!(
        "📝 POST /api/teams - name: {}, admin: {}",
        body.name.as_deref().unwrap_or("N/A"),
        body.admin_uid.as_deref().unwrap_or("N/A")
    );

    let admin_uid = match resolve_caller(&req, &body.admin_uid) {
        Ok(uid) => uid,
        Err(e) => return error_response("Create team", &e, "Error creating team"),
    };

    let (Some(name), Some(admin_uid)) = (present_trimmed(&body.name), admin_uid) else {
        log::warn!("⚠️ Create team rejected: missing fields");
        return HttpResponse::BadRequest().json(message_body("Name and admin are required."));
    };

    match team_service::create_team(&state, name, &admin_uid).await {
        Ok(team) => {
            let join_token = team.id_hex();
            HttpResponse::Created().json(CreateTeamResponse {
                team: TeamResponse::from(team),
                join_token,
            })
        }
        Err(e) => error_response("Create team", &e, "Error creating team"),
    }
}

/// PUT /api/teams/{id} - admin-only update
#[utoipa::path(
    put,
    path = "/api/teams/{id}",
    tag = "Teams",
    params(("id" = String, Path, description = "Team id")),
    request_body = UpdateTeamRequest,
    responses(
        (status = 200, description = "Team saved", body = TeamEnvelope),
        (status = 400, description = "Missing uid", body = MessageResponse),
        (status = 403, description = "Requester is not the admin", body = MessageResponse),
        (status = 404, description = "User or team not found", body = MessageResponse),
        (status = 500, description = "Store or identity provider error", body = MessageResponse)
    )
)]
pub async fn update_team(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateTeamRequest>,
) -> HttpResponse {
    let team_id = path.into_inner();
    log::info!(
        "✏️ PUT /api/teams/{} - uid: {}",
        team_id,
        body.uid.as_deref().unwrap_or("N/A")
    );

    let uid = match resolve_caller(&req, &body.uid) {
        Ok(Some(uid)) => uid,
        Ok(None) => {
            log::warn!("⚠️ Update team rejected: missing uid");
            return HttpResponse::BadRequest().json(message_body("User ID is required"));
        }
        Err(e) => return error_response("Update team", &e, "Error updating team"),
    };

    match team_service::update_team(&state, &team_id, &uid, present_trimmed(&body.name)).await {
        Ok(team) => {
            log::info!("✅ Team updated: {}", team_id);
            HttpResponse::Ok().json(TeamEnvelope {
                team: TeamResponse::from(team),
            })
        }
        Err(e) => error_response("Update team", &e, "Error updating team"),
    }
}

/// DELETE /api/teams/{id}
#[utoipa::path(
    delete,
    path = "/api/teams/{id}",
    tag = "Teams",
    params(("id" = String, Path, description = "Team id")),
    responses(
        (status = 200, description = "Team deleted", body = MessageResponse),
        (status = 404, description = "Team not found", body = MessageResponse),
        (status = 500, description = "Store error", body = MessageResponse)
    )
)]
pub async fn delete_team(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let team_id = path.into_inner();
    log::info!("🗑️ DELETE /api/teams/{}", team_id);

    match team_service::delete_team(&state, &team_id).await {
        Ok(()) => HttpResponse::Ok().json(message_body("Team deleted successfully")),
        Err(e) => error_response("Delete team", &e, "Error deleting team"),
    }
}

/// POST /api/teams/join - join a team with its join token
#[utoipa::path(
    post,
    path = "/api/teams/join",
    tag = "Teams",
    request_body = JoinTeamRequest,
    responses(
        (status = 200, description = "Joined", body = TeamEnvelope),
        (status = 400, description = "Missing fields or already a member", body = MessageResponse),
        (status = 404, description = "Team or user not found", body = MessageResponse),
        (status = 500, description = "Store error", body = MessageResponse)
    )
)]
pub async fn join_team(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<JoinTeamRequest>,
) -> HttpResponse {
    log::info!(
        "🤝 POST /api/teams/join - token: {}, uid: {}",
        body.join_token.as_deref().unwrap_or("N/A"),
        body.uid.as_deref().unwrap_or("N/A")
    );

    let uid = match resolve_caller(&req, &body.uid) {
        Ok(uid) => uid,
        Err(e) => return error_response("Join team", &e, "Error joining team"),
    };

    let (Some(join_token), Some(uid)) = (present(&body.join_token), uid) else {
        log::warn!("⚠️ Join team rejected: missing fields");
        return HttpResponse::BadRequest().json(message_body("joinToken and uid are required"));
    };

    match team_service::join_team(&state, join_token, &uid).await {
        Ok(team) => HttpResponse::Ok().json(TeamEnvelope {
            team: TeamResponse::from(team),
        }),
        Err(e) => error_response("Join team", &e, "Error joining team"),
    }
}

/// GET /api/teams/{id}/users - members resolved to user records
#[utoipa::path(
    get,
    path = "/api/teams/{id}/users",
    tag = "Teams",
    params(("id" = String, Path, description = "Team id")),
    responses(
        (status = 200, description = "Team members", body = TeamMembersResponse),
        (status = 404, description = "Team not found", body = MessageResponse),
        (status = 500, description = "Store error", body = MessageResponse)
    )
)]
pub async fn list_members(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let team_id = path.into_inner();
    log::info!("👥 GET /api/teams/{}/users", team_id);

    match team_service::list_members(&state, &team_id).await {
        Ok(users) => {
            log::info!("✅ Listed {} members of {}", users.len(), team_id);
            HttpResponse::Ok().json(TeamMembersResponse {
                users: users.into_iter().map(UserResponse::from).collect(),
            })
        }
        Err(e) => error_response("List members", &e, "Error getting users"),
    }
}
