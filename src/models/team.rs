use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use super::format_timestamp;
use crate::utils::AppError;

/// Team (stored in the `teams` collection).
///
/// `admin_id` and `member_ids` hold external identity identifiers, the same
/// value as `User::firebase_uid`. The team's `_id` is also its join token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub admin_id: String,
    #[serde(default)]
    pub member_ids: Vec<String>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl Team {
    pub fn has_member(&self, uid: &str) -> bool {
        self.member_ids.iter().any(|member| member == uid)
    }

    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct NewTeam {
    pub name: String,
    pub admin_id: String,
}

impl NewTeam {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.is_empty() {
            return Err(AppError::Validation("name is required".to_string()));
        }
        if self.admin_id.is_empty() {
            return Err(AppError::Validation("adminId is required".to_string()));
        }
        Ok(())
    }

    /// The admin is always the first member.
    pub fn into_team(self, now: BsonDateTime) -> Team {
        Team {
            id: None,
            member_ids: vec![self.admin_id.clone()],
            name: self.name,
            admin_id: self.admin_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Outcome of a conditional join
#[derive(Debug)]
pub enum MembershipChange {
    Added(Team),
    AlreadyMember,
    TeamMissing,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub admin_id: String,
    pub member_ids: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Team> for TeamResponse {
    fn from(t: Team) -> Self {
        TeamResponse {
            id: t.id_hex(),
            name: t.name,
            admin_id: t.admin_id,
            member_ids: t.member_ids,
            created_at: format_timestamp(t.created_at),
            updated_at: format_timestamp(t.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_team_starts_with_admin_as_only_member() {
        let team = NewTeam {
            name: "Eng".into(),
            admin_id: "abc".into(),
        }
        .into_team(BsonDateTime::now());

        assert_eq!(team.member_ids, vec!["abc".to_string()]);
        assert_eq!(team.admin_id, "abc");
        assert!(team.has_member("abc"));
        assert!(!team.has_member("xyz"));
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        let team = NewTeam {
            name: String::new(),
            admin_id: "abc".into(),
        };
        assert!(matches!(team.validate(), Err(AppError::Validation(_))));
    }
}
