use std::fmt::Debug;

use log::*;

use crate::{
    db_types::User,
    helpers::{hash_password, is_valid_email, verify_password, MIN_PASSWORD_LENGTH},
    traits::{UserApiError, UserManagement},
};

/// Registration and password login for storefront users.
pub struct UserApi<B> {
    db: B,
}

impl<B> Debug for UserApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserApi")
    }
}

impl<B> UserApi<B>
where B: UserManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Creates a new account. The first account ever created is an admin.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, UserApiError> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(UserApiError::ValidationError(format!("{email} is not a valid email address")));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(UserApiError::ValidationError(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
            )));
        }
        if self.db.fetch_user_by_email(&email).await?.is_some() {
            return Err(UserApiError::EmailAlreadyExists);
        }
        let hash = hash_password(password)?;
        let user = self.db.insert_user(&email, &hash).await?;
        info!("👤️ New user #{} registered{}", user.id, if user.is_admin { " as admin" } else { "" });
        Ok(user)
    }

    /// Checks the credentials. Unknown emails and wrong passwords give the same error.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, UserApiError> {
        let email = normalize_email(email);
        let user = self.db.fetch_user_by_email(&email).await?.ok_or(UserApiError::InvalidCredentials)?;
        if !verify_password(password, &user.password_hash)? {
            debug!("👤️ Failed login for user #{}", user.id);
            return Err(UserApiError::InvalidCredentials);
        }
        debug!("👤️ User #{} logged in", user.id);
        Ok(user)
    }

    /// As [`Self::authenticate`], but only admins get through.
    pub async fn authenticate_admin(&self, email: &str, password: &str) -> Result<User, UserApiError> {
        let user = self.authenticate(email, password).await?;
        if !user.is_admin {
            warn!("👤️ User #{} tried to log in as an admin", user.id);
            return Err(UserApiError::InvalidCredentials);
        }
        Ok(user)
    }

    pub async fn user_by_id(&self, user_id: i64) -> Result<User, UserApiError> {
        self.db.fetch_user_by_id(user_id).await?.ok_or(UserApiError::UserNotFound(user_id))
    }

    pub async fn all_users(&self) -> Result<Vec<User>, UserApiError> {
        self.db.fetch_all_users().await
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
