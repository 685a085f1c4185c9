use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use super::format_timestamp;
use crate::utils::AppError;

/// Local user profile (stored in the `users` collection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// External identity identifier, unique
    pub firebase_uid: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

/// Fields needed to create a user record
#[derive(Debug, Clone)]
pub struct NewUser {
    pub firebase_uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), AppError> {
        let required = [
            ("firebaseUid", &self.firebase_uid),
            ("email", &self.email),
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(AppError::Validation(format!("{} is required", name)));
            }
        }
        Ok(())
    }

    pub fn into_user(self, now: BsonDateTime) -> User {
        User {
            id: None,
            firebase_uid: self.firebase_uid,
            email: self.email,
            display_name: self.display_name,
            first_name: self.first_name,
            last_name: self.last_name,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub firebase_uid: String,
    pub email: String,
    /// Empty when the provider has no display name
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        UserResponse {
            id: u.id.map(|id| id.to_hex()).unwrap_or_default(),
            firebase_uid: u.firebase_uid,
            email: u.email,
            display_name: u.display_name.unwrap_or_default(),
            first_name: u.first_name,
            last_name: u.last_name,
            created_at: format_timestamp(u.created_at),
            updated_at: format_timestamp(u.updated_at),
        }
    }
}
