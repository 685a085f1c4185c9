pub mod team;
pub mod user;

pub use team::*;
pub use user::*;

use mongodb::bson::DateTime as BsonDateTime;

/// RFC 3339 rendering of a stored timestamp
pub fn format_timestamp(dt: BsonDateTime) -> String {
    chrono::DateTime::from_timestamp_millis(dt.timestamp_millis())
        .map(|d| d.to_rfc3339())
        .unwrap_or_default()
}
