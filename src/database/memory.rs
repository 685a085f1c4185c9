//! In-memory stores for handler and service tests.

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use std::collections::HashMap;
use std::sync::RwLock;

use super::{order_by_identity, TeamStore, UserDirectory};
use crate::models::{MembershipChange, NewTeam, NewUser, Team, User};
use crate::utils::AppError;

fn poisoned() -> AppError {
    AppError::DatabaseError("lock poisoned".into())
}

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    teams: RwLock<HashMap<ObjectId, Team>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.users.read().map(|u| u.len()).unwrap_or(0)
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_by_identity(&self, firebase_uid: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.get(firebase_uid).cloned())
    }

    async fn find_many_by_identity(&self, firebase_uids: &[String]) -> Result<Vec<User>, AppError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        let found = users
            .values()
            .filter(|u| firebase_uids.contains(&u.firebase_uid))
            .cloned()
            .collect();
        Ok(order_by_identity(firebase_uids, found))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        user.validate()?;

        let mut users = self.users.write().map_err(|_| poisoned())?;
        if users.contains_key(&user.firebase_uid) {
            return Err(AppError::Validation(format!(
                "duplicate key: firebase_uid {}",
                user.firebase_uid
            )));
        }

        let mut created = user.into_user(BsonDateTime::now());
        created.id = Some(ObjectId::new());
        users.insert(created.firebase_uid.clone(), created.clone());
        Ok(created)
    }

    async fn find_or_create_user(&self, user: NewUser) -> Result<User, AppError> {
        user.validate()?;

        let mut users = self.users.write().map_err(|_| poisoned())?;
        let entry = users.entry(user.firebase_uid.clone()).or_insert_with(|| {
            let mut created = user.into_user(BsonDateTime::now());
            created.id = Some(ObjectId::new());
            created
        });
        Ok(entry.clone())
    }
}

#[async_trait]
impl TeamStore for MemoryStore {
    async fn create_team(&self, team: NewTeam) -> Result<Team, AppError> {
        team.validate()?;

        let mut created = team.into_team(BsonDateTime::now());
        let id = ObjectId::new();
        created.id = Some(id);

        self.teams
            .write()
            .map_err(|_| poisoned())?
            .insert(id, created.clone());
        Ok(created)
    }

    async fn find_team(&self, team_id: &str) -> Result<Option<Team>, AppError> {
        let Ok(id) = ObjectId::parse_str(team_id) else {
            return Ok(None);
        };
        let teams = self.teams.read().map_err(|_| poisoned())?;
        Ok(teams.get(&id).cloned())
    }

    async fn update_team(&self, team_id: &str, name: Option<&str>) -> Result<Option<Team>, AppError> {
        let Ok(id) = ObjectId::parse_str(team_id) else {
            return Ok(None);
        };
        let mut teams = self.teams.write().map_err(|_| poisoned())?;
        Ok(teams.get_mut(&id).map(|team| {
            if let Some(name) = name {
                team.name = name.to_string();
            }
            team.updated_at = BsonDateTime::now();
            team.clone()
        }))
    }

    async fn delete_team(&self, team_id: &str) -> Result<bool, AppError> {
        let Ok(id) = ObjectId::parse_str(team_id) else {
            return Ok(false);
        };
        let mut teams = self.teams.write().map_err(|_| poisoned())?;
        Ok(teams.remove(&id).is_some())
    }

    async fn add_member(&self, team_id: &str, uid: &str) -> Result<MembershipChange, AppError> {
        let Ok(id) = ObjectId::parse_str(team_id) else {
            return Ok(MembershipChange::TeamMissing);
        };
        let mut teams = self.teams.write().map_err(|_| poisoned())?;
        let Some(team) = teams.get_mut(&id) else {
            return Ok(MembershipChange::TeamMissing);
        };
        if team.has_member(uid) {
            return Ok(MembershipChange::AlreadyMember);
        }
        team.member_ids.push(uid.to_string());
        team.updated_at = BsonDateTime::now();
        Ok(MembershipChange::Added(team.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_team() -> NewTeam {
        NewTeam {
            name: "Eng".into(),
            admin_id: "abc".into(),
        }
    }

    #[tokio::test]
    async fn test_add_member_outcomes() {
        let store = MemoryStore::new();
        let team_id = store.create_team(new_team()).await.unwrap().id_hex();

        match store.add_member(&team_id, "def").await.unwrap() {
            MembershipChange::Added(team) => assert_eq!(team.member_ids, vec!["abc", "def"]),
            other => panic!("expected Added, got {:?}", other),
        }

        assert!(matches!(
            store.add_member(&team_id, "def").await.unwrap(),
            MembershipChange::AlreadyMember
        ));
        assert!(matches!(
            store.add_member(&team_id, "abc").await.unwrap(),
            MembershipChange::AlreadyMember
        ));

        let team = store.find_team(&team_id).await.unwrap().unwrap();
        assert_eq!(team.member_ids, vec!["abc", "def"]);

        store.delete_team(&team_id).await.unwrap();
        assert!(matches!(
            store.add_member(&team_id, "ghi").await.unwrap(),
            MembershipChange::TeamMissing
        ));
        assert!(matches!(
            store.add_member("not-an-id", "ghi").await.unwrap(),
            MembershipChange::TeamMissing
        ));
    }
}
