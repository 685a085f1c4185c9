use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Team Service API",
        version = "1.0.0",
        description = "User registration and team membership.\n\n**Authentication:** users are identified by their Firebase uid. When ID-token enforcement is enabled, every `/api` call needs a Firebase ID token as Bearer token and the body uid must match it."
    ),
    paths(
        // Health
        crate::api::health::health_check,

        // Auth
        crate::api::auth::authenticate,

        // Teams
        crate::api::teams::create_team,
        crate::api::teams::update_team,
        crate::api::teams::delete_team,
        crate::api::teams::join_team,
        crate::api::teams::list_members,
    ),
    components(
        schemas(
            crate::api::MessageResponse,
            crate::api::health::HealthResponse,

            // Auth
            crate::api::auth::AuthRequest,
            crate::api::auth::AuthResponse,
            crate::models::UserResponse,

            // Teams
            crate::api::teams::CreateTeamRequest,
            crate::api::teams::UpdateTeamRequest,
            crate::api::teams::JoinTeamRequest,
            crate::api::teams::CreateTeamResponse,
            crate::api::teams::TeamEnvelope,
            crate::api::teams::TeamMembersResponse,
            crate::models::TeamResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Find-or-create the local user record for a Firebase identity."),
        (name = "Teams", description = "Team creation, admin-only updates, deletion, joining by token and member listing."),
        (name = "Health", description = "Liveness check."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Firebase ID token"))
                        .build()
                ),
            );
        }
    }
}
