use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime};
use mongodb::options::ReturnDocument;

use super::{order_by_identity, MongoDB, UserDirectory};
use crate::models::{NewUser, User};
use crate::utils::AppError;

#[async_trait]
impl UserDirectory for MongoDB {
    async fn find_by_identity(&self, firebase_uid: &str) -> Result<Option<User>, AppError> {
        let user = self
            .users()
            .find_one(doc! { "firebase_uid": firebase_uid })
            .await?;
        Ok(user)
    }

    async fn find_many_by_identity(&self, firebase_uids: &[String]) -> Result<Vec<User>, AppError> {
        if firebase_uids.is_empty() {
            return Ok(Vec::new());
        }

        let users: Vec<User> = self
            .users()
            .find(doc! { "firebase_uid": { "$in": firebase_uids } })
            .await?
            .try_collect()
            .await?;

        Ok(order_by_identity(firebase_uids, users))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        user.validate()?;

        let mut created = user.into_user(BsonDateTime::now());
        let result = self.users().insert_one(&created).await?;
        created.id = result.inserted_id.as_object_id();

        log::info!("✅ User created: {}", created.firebase_uid);
        Ok(created)
    }

    async fn find_or_create_user(&self, user: NewUser) -> Result<User, AppError> {
        user.validate()?;

        let collection = self.users();
        let filter = doc! { "firebase_uid": &user.firebase_uid };
        let now = BsonDateTime::now();

        let mut on_insert = doc! {
            "email": &user.email,
            "first_name": &user.first_name,
            "last_name": &user.last_name,
            "created_at": now,
            "updated_at": now,
        };
        if let Some(display_name) = &user.display_name {
            on_insert.insert("display_name", display_name);
        }

        let upserted = collection
            .find_one_and_update(filter.clone(), doc! { "$setOnInsert": on_insert })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await;

        match upserted {
            Ok(Some(found)) => Ok(found),
            Ok(None) => Err(AppError::DatabaseError(format!(
                "upsert returned no document for {}",
                user.firebase_uid
            ))),
            // Two concurrent upserts for the same uid: the loser hits the
            // unique index, and the winner's record is the answer.
            Err(e) if AppError::is_duplicate_key(&e) => {
                log::debug!("🔁 Concurrent upsert for {}, re-reading", user.firebase_uid);
                collection.find_one(filter).await?.ok_or_else(|| {
                    AppError::DatabaseError(format!("user {} vanished after upsert", user.firebase_uid))
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}
