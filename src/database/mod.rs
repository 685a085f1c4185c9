mod teams;
mod users;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use mongodb::{Client, Collection, Database};
use std::collections::HashMap;
use std::error::Error;

use crate::models::{MembershipChange, NewTeam, NewUser, Team, User};
use crate::utils::AppError;

pub const USERS_COLLECTION: &str = "users";
pub const TEAMS_COLLECTION: &str = "teams";

const DEFAULT_DATABASE: &str = "team_service";

/// Local user profiles keyed by external identity identifier
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_identity(&self, firebase_uid: &str) -> Result<Option<User>, AppError>;

    /// Resolves identifiers in the given order, skipping ones with no record.
    async fn find_many_by_identity(&self, firebase_uids: &[String]) -> Result<Vec<User>, AppError>;

    /// Fails with `Validation` when a required field is empty or the identity
    /// already exists.
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;

    /// Atomic insert-if-absent. An existing record is returned untouched.
    async fn find_or_create_user(&self, user: NewUser) -> Result<User, AppError>;
}

/// Teams and their membership lists.
///
/// Team ids that do not parse as an ObjectId behave like unknown ids.
#[async_trait]
pub trait TeamStore: Send + Sync {
    async fn create_team(&self, team: NewTeam) -> Result<Team, AppError>;

    async fn find_team(&self, team_id: &str) -> Result<Option<Team>, AppError>;

    /// Refreshes `updated_at` and sets the name when one is given.
    async fn update_team(&self, team_id: &str, name: Option<&str>) -> Result<Option<Team>, AppError>;

    /// Returns false when nothing was deleted.
    async fn delete_team(&self, team_id: &str) -> Result<bool, AppError>;

    /// Appends `uid` unless it is already a member, in one conditional write.
    async fn add_member(&self, team_id: &str, uid: &str) -> Result<MembershipChange, AppError>;
}

/// Reorders `users` to follow `firebase_uids`, dropping unresolved ids.
pub fn order_by_identity(firebase_uids: &[String], users: Vec<User>) -> Vec<User> {
    let by_uid: HashMap<String, User> = users
        .into_iter()
        .map(|u| (u.firebase_uid.clone(), u))
        .collect();

    firebase_uids
        .iter()
        .filter_map(|uid| by_uid.get(uid).cloned())
        .collect()
}

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let db_name = client_options
            .default_database
            .clone()
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let client = Client::with_options(client_options)?;
        let db = client.database(&db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the indexes the stores rely on.
    ///
    /// The unique index on `users.firebase_uid` backs `find_or_create_user`,
    /// so a failure to create it aborts startup.
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let users = self.users();
        let uid_index = IndexModel::builder()
            .keys(doc! { "firebase_uid": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        users.create_index(uid_index).await?;
        log::info!("   ✅ Index created: users(firebase_uid) unique");

        let teams = self.teams();
        let member_index = IndexModel::builder()
            .keys(doc! { "member_ids": 1 })
            .build();

        match teams.create_index(member_index).await {
            Ok(_) => log::info!("   ✅ Index created: teams(member_ids)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection(USERS_COLLECTION)
    }

    pub fn teams(&self) -> Collection<Team> {
        self.db.collection(TEAMS_COLLECTION)
    }
}
