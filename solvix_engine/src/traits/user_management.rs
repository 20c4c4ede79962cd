use thiserror::Error;

use crate::{db_types::User, helpers::PasswordError};

#[derive(Debug, Clone, Error)]
pub enum UserApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("A user with this email address already exists")]
    EmailAlreadyExists,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("User #{0} does not exist")]
    UserNotFound(i64),
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("{0}")]
    PasswordHashError(#[from] PasswordError),
}

impl From<sqlx::Error> for UserApiError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => UserApiError::EmailAlreadyExists,
            e => UserApiError::DatabaseError(e.to_string()),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait UserManagement {
    /// Stores a new user. The very first user stored becomes an admin; everyone after that is a regular customer.
    async fn insert_user(&self, email: &str, password_hash: &str) -> Result<User, UserApiError>;

    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, UserApiError>;

    async fn fetch_user_by_id(&self, user_id: i64) -> Result<Option<User>, UserApiError>;

    async fn fetch_all_users(&self) -> Result<Vec<User>, UserApiError>;
}
