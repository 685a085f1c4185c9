use crate::models::{NewUser, User};
use crate::state::AppState;
use crate::utils::AppError;

/// Synchronizes an external identity into a local user record.
///
/// The profile is resolved through the identity provider first, so an unknown
/// uid never reaches the directory. First and last name only apply when the
/// record is created; an existing record is returned as stored.
pub async fn find_or_create_user(
    state: &AppState,
    uid: &str,
    first_name: &str,
    last_name: &str,
) -> Result<User, AppError> {
    let profile = state.identity.get_user(uid).await?;

    if let Some(existing) = state.users.find_by_identity(&profile.uid).await? {
        log::debug!("👤 Existing user: {}", existing.firebase_uid);
        return Ok(existing);
    }

    let new_user = NewUser {
        firebase_uid: profile.uid,
        email: profile.email.unwrap_or_default(),
        display_name: Some(profile.display_name.unwrap_or_default()),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
    };

    let user = state.users.find_or_create_user(new_user).await?;
    log::info!("✅ User synchronized: {}", user.firebase_uid);
    Ok(user)
}
