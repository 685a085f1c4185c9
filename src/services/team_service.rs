use crate::models::{MembershipChange, NewTeam, Team, User};
use crate::services::identity_service::IdentityError;
use crate::state::AppState;
use crate::utils::AppError;

fn team_not_found() -> AppError {
    AppError::NotFound("Team not found".to_string())
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

fn already_member() -> AppError {
    AppError::Conflict("User is already a member".to_string())
}

/// Creates a team administered by `admin_uid`, who becomes its first member.
pub async fn create_team(state: &AppState, name: &str, admin_uid: &str) -> Result<Team, AppError> {
    let admin = state
        .users
        .find_by_identity(admin_uid)
        .await?
        .ok_or_else(|| AppError::NotFound("Admin not found".to_string()))?;

    let team = state
        .teams
        .create_team(NewTeam {
            name: name.to_string(),
            admin_id: admin.firebase_uid,
        })
        .await?;

    log::info!("✅ Team created: {} ({})", team.id_hex(), team.name);
    Ok(team)
}

/// Admin-only update. Without a new name this only refreshes `updated_at`.
pub async fn update_team(
    state: &AppState,
    team_id: &str,
    requester_uid: &str,
    new_name: Option<&str>,
) -> Result<Team, AppError> {
    let profile = state.identity.get_user(requester_uid).await.map_err(|e| match e {
        IdentityError::NotFound(_) => user_not_found(),
        other => AppError::Identity(other),
    })?;

    state
        .users
        .find_by_identity(&profile.uid)
        .await?
        .ok_or_else(user_not_found)?;

    let team = state.teams.find_team(team_id).await?.ok_or_else(team_not_found)?;

    if team.admin_id != profile.uid {
        return Err(AppError::Forbidden("Unauthorized".to_string()));
    }

    // The team may have been deleted between the read and this write
    state
        .teams
        .update_team(team_id, new_name)
        .await?
        .ok_or_else(team_not_found)
}

pub async fn delete_team(state: &AppState, team_id: &str) -> Result<(), AppError> {
    if state.teams.delete_team(team_id).await? {
        log::info!("🗑️ Team deleted: {}", team_id);
        Ok(())
    } else {
        Err(team_not_found())
    }
}

/// Adds `uid` to the team identified by `join_token`.
pub async fn join_team(state: &AppState, join_token: &str, uid: &str) -> Result<Team, AppError> {
    let team = state.teams.find_team(join_token).await?.ok_or_else(team_not_found)?;

    let user = state
        .users
        .find_by_identity(uid)
        .await?
        .ok_or_else(user_not_found)?;

    if team.has_member(&user.firebase_uid) {
        return Err(already_member());
    }

    match state.teams.add_member(join_token, &user.firebase_uid).await? {
        MembershipChange::Added(team) => {
            log::info!("✅ {} joined team {}", user.firebase_uid, join_token);
            Ok(team)
        }
        // Lost a race with a concurrent join of the same user
        MembershipChange::AlreadyMember => Err(already_member()),
        MembershipChange::TeamMissing => Err(team_not_found()),
    }
}

/// Members resolved to user records, in membership order.
pub async fn list_members(state: &AppState, team_id: &str) -> Result<Vec<User>, AppError> {
    let team = state.teams.find_team(team_id).await?.ok_or_else(team_not_found)?;
    state.users.find_many_by_identity(&team.member_ids).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::database::TeamStore;
    use crate::services::auth_service::find_or_create_user;
    use crate::services::identity_service::StaticIdentityProvider;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// What another request does between the membership check and the write
    enum Interleaving {
        SameUserJoins,
        TeamDeleted,
    }

    /// Team store that lets a concurrent request win right before `add_member`
    struct RacingTeamStore {
        inner: Arc<MemoryStore>,
        interleaving: Interleaving,
    }

    #[async_trait]
    impl TeamStore for RacingTeamStore {
        async fn create_team(&self, team: NewTeam) -> Result<Team, AppError> {
            self.inner.create_team(team).await
        }

        async fn find_team(&self, team_id: &str) -> Result<Option<Team>, AppError> {
            self.inner.find_team(team_id).await
        }

        async fn update_team(&self, team_id: &str, name: Option<&str>) -> Result<Option<Team>, AppError> {
            self.inner.update_team(team_id, name).await
        }

        async fn delete_team(&self, team_id: &str) -> Result<bool, AppError> {
            self.inner.delete_team(team_id).await
        }

        async fn add_member(&self, team_id: &str, uid: &str) -> Result<MembershipChange, AppError> {
            match self.interleaving {
                Interleaving::SameUserJoins => {
                    self.inner.add_member(team_id, uid).await?;
                }
                Interleaving::TeamDeleted => {
                    self.inner.delete_team(team_id).await?;
                }
            }
            self.inner.add_member(team_id, uid).await
        }
    }

    async fn racing_state(interleaving: Interleaving) -> (AppState, String) {
        let (seed, store) = AppState::in_memory(StaticIdentityProvider::with_users(&["abc", "def"]));
        for uid in ["abc", "def"] {
            find_or_create_user(&seed, uid, "First", "Last").await.unwrap();
        }
        let team_id = store
            .create_team(NewTeam {
                name: "Eng".into(),
                admin_id: "abc".into(),
            })
            .await
            .unwrap()
            .id_hex();

        let racing = RacingTeamStore {
            inner: store.clone(),
            interleaving,
        };
        let state = AppState::new(store, Arc::new(racing), seed.identity.clone());
        (state, team_id)
    }

    async fn state_with_users(uids: &[&str]) -> AppState {
        let (state, _) = AppState::in_memory(StaticIdentityProvider::with_users(uids));
        for uid in uids {
            find_or_create_user(&state, uid, "First", "Last").await.unwrap();
        }
        state
    }

    #[tokio::test]
    async fn test_create_team_admin_is_sole_member() {
        let state = state_with_users(&["abc"]).await;

        let team = create_team(&state, "Eng", "abc").await.unwrap();

        assert_eq!(team.name, "Eng");
        assert_eq!(team.admin_id, "abc");
        assert_eq!(team.member_ids, vec!["abc".to_string()]);
        assert!(team.id.is_some());
    }

    #[tokio::test]
    async fn test_create_team_unknown_admin() {
        let state = state_with_users(&[]).await;

        let err = create_team(&state, "Eng", "ghost").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg == "Admin not found"));
    }

    #[tokio::test]
    async fn test_join_then_rejoin() {
        let state = state_with_users(&["abc", "def"]).await;
        let team = create_team(&state, "Eng", "abc").await.unwrap();
        let token = team.id_hex();

        let joined = join_team(&state, &token, "def").await.unwrap();
        assert_eq!(joined.member_ids, vec!["abc".to_string(), "def".to_string()]);

        let err = join_team(&state, &token, "def").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let after = state.teams.find_team(&token).await.unwrap().unwrap();
        assert_eq!(after.member_ids.iter().filter(|m| *m == "def").count(), 1);
        assert_eq!(after.member_ids.len(), 2);
    }

    #[tokio::test]
    async fn test_admin_cannot_rejoin() {
        let state = state_with_users(&["abc"]).await;
        let team = create_team(&state, "Eng", "abc").await.unwrap();

        let err = join_team(&state, &team.id_hex(), "abc").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg == "User is already a member"));
    }

    #[tokio::test]
    async fn test_join_unknown_team_or_user() {
        let state = state_with_users(&["abc"]).await;
        let team = create_team(&state, "Eng", "abc").await.unwrap();

        let err = join_team(&state, "not-an-object-id", "abc").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg == "Team not found"));

        let err = join_team(&state, &team.id_hex(), "ghost").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg == "User not found"));
    }

    #[tokio::test]
    async fn test_only_admin_can_update() {
        let state = state_with_users(&["abc", "def"]).await;
        let team = create_team(&state, "Eng", "abc").await.unwrap();
        let id = team.id_hex();

        let err = update_team(&state, &id, "def", Some("Hijacked")).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(state.teams.find_team(&id).await.unwrap().unwrap().name, "Eng");

        let renamed = update_team(&state, &id, "abc", Some("Platform")).await.unwrap();
        assert_eq!(renamed.name, "Platform");

        let saved = update_team(&state, &id, "abc", None).await.unwrap();
        assert_eq!(saved.name, "Platform");
    }

    #[tokio::test]
    async fn test_update_requires_known_requester() {
        let state = state_with_users(&["abc"]).await;
        let team = create_team(&state, "Eng", "abc").await.unwrap();

        let err = update_team(&state, &team.id_hex(), "ghost", None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg == "User not found"));
    }

    #[tokio::test]
    async fn test_deleted_team_is_gone_for_every_operation() {
        let state = state_with_users(&["abc", "def"]).await;
        let team = create_team(&state, "Eng", "abc").await.unwrap();
        let id = team.id_hex();

        delete_team(&state, &id).await.unwrap();

        assert!(matches!(delete_team(&state, &id).await, Err(AppError::NotFound(_))));
        assert!(matches!(update_team(&state, &id, "abc", None).await, Err(AppError::NotFound(_))));
        assert!(matches!(join_team(&state, &id, "def").await, Err(AppError::NotFound(_))));
        assert!(matches!(list_members(&state, &id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_members_in_join_order() {
        let state = state_with_users(&["abc", "def", "ghi"]).await;
        let team = create_team(&state, "Eng", "abc").await.unwrap();
        let id = team.id_hex();

        join_team(&state, &id, "ghi").await.unwrap();
        join_team(&state, &id, "def").await.unwrap();

        let members: Vec<String> = list_members(&state, &id)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.firebase_uid)
            .collect();
        assert_eq!(members, vec!["abc", "ghi", "def"]);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_join_is_conflict() {
        let (state, team_id) = racing_state(Interleaving::SameUserJoins).await;

        let err = join_team(&state, &team_id, "def").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref msg) if msg == "User is already a member"));

        let team = state.teams.find_team(&team_id).await.unwrap().unwrap();
        assert_eq!(team.member_ids, vec!["abc", "def"]);
    }

    #[tokio::test]
    async fn test_join_racing_delete_is_not_found() {
        let (state, team_id) = racing_state(Interleaving::TeamDeleted).await;

        let err = join_team(&state, &team_id, "def").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref msg) if msg == "Team not found"));
    }
}
