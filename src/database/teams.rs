use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};
use mongodb::options::ReturnDocument;

use super::{MongoDB, TeamStore};
use crate::models::{MembershipChange, NewTeam, Team};
use crate::utils::AppError;

fn parse_team_id(team_id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(team_id).ok()
}

#[async_trait]
impl TeamStore for MongoDB {
    async fn create_team(&self, team: NewTeam) -> Result<Team, AppError> {
        team.validate()?;

        let mut created = team.into_team(BsonDateTime::now());
        let result = self.teams().insert_one(&created).await?;
        created.id = result.inserted_id.as_object_id();

        Ok(created)
    }

    async fn find_team(&self, team_id: &str) -> Result<Option<Team>, AppError> {
        let Some(object_id) = parse_team_id(team_id) else {
            return Ok(None);
        };
        Ok(self.teams().find_one(doc! { "_id": object_id }).await?)
    }

    async fn update_team(&self, team_id: &str, name: Option<&str>) -> Result<Option<Team>, AppError> {
        let Some(object_id) = parse_team_id(team_id) else {
            return Ok(None);
        };

        let mut update_doc = doc! { "updated_at": BsonDateTime::now() };
        if let Some(name) = name {
            update_doc.insert("name", name);
        }

        let updated = self
            .teams()
            .find_one_and_update(doc! { "_id": object_id }, doc! { "$set": update_doc })
            .return_document(ReturnDocument::After)
            .await?;

        Ok(updated)
    }

    async fn delete_team(&self, team_id: &str) -> Result<bool, AppError> {
        let Some(object_id) = parse_team_id(team_id) else {
            return Ok(false);
        };

        let result = self.teams().delete_one(doc! { "_id": object_id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn add_member(&self, team_id: &str, uid: &str) -> Result<MembershipChange, AppError> {
        let Some(object_id) = parse_team_id(team_id) else {
            return Ok(MembershipChange::TeamMissing);
        };

        let collection = self.teams();
        let updated = collection
            .find_one_and_update(
                doc! { "_id": object_id, "member_ids": { "$ne": uid } },
                doc! {
                    "$push": { "member_ids": uid },
                    "$set": { "updated_at": BsonDateTime::now() },
                },
            )
            .return_document(ReturnDocument::After)
            .await?;

        if let Some(team) = updated {
            return Ok(MembershipChange::Added(team));
        }

        // No match: either the team is gone or uid is already in member_ids
        match collection.find_one(doc! { "_id": object_id }).await? {
            Some(_) => Ok(MembershipChange::AlreadyMember),
            None => Ok(MembershipChange::TeamMissing),
        }
    }
}
