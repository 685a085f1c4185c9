use std::fmt;

use mongodb::error::{ErrorKind, WriteFailure};

use crate::services::identity_service::IdentityError;

/// MongoDB server code for a unique index violation
const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug)]
pub enum AppError {
    /// Missing or malformed required field
    Validation(String),
    NotFound(String),
    Forbidden(String),
    /// Duplicate membership
    Conflict(String),
    Unauthorized(String),
    Identity(IdentityError),
    DatabaseError(String),
}

impl AppError {
    /// True for a duplicate-key rejection coming from a unique index.
    ///
    /// Inserts report it as a write error, `findAndModify` upserts as a
    /// command error.
    pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
        match *err.kind {
            ErrorKind::Write(WriteFailure::WriteError(ref we)) => we.code == DUPLICATE_KEY_CODE,
            ErrorKind::Command(ref ce) => ce.code == DUPLICATE_KEY_CODE,
            _ => false,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Identity(e) => write!(f, "Identity provider error: {}", e),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        if AppError::is_duplicate_key(&err) {
            AppError::Validation(format!("duplicate key: {}", err))
        } else {
            AppError::DatabaseError(err.to_string())
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        AppError::Identity(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind() {
        let err = AppError::Conflict("User is already a member".to_string());
        assert_eq!(err.to_string(), "Conflict: User is already a member");

        let err = AppError::Identity(IdentityError::NotFound("abc".to_string()));
        assert!(err.to_string().starts_with("Identity provider error"));
    }

    #[test]
    fn test_non_write_errors_map_to_database_error() {
        let err: AppError = mongodb::error::Error::custom("boom").into();
        assert!(matches!(err, AppError::DatabaseError(_)));
    }
}
