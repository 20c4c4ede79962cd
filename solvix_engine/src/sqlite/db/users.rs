use log::info;
use sqlx::SqliteConnection;

use crate::db_types::User;

/// Inserts a user. The `is_admin` flag is computed in the same statement, so the first user in an empty table is
/// made an admin even if two registrations race.
pub async fn insert_user(email: &str, password_hash: &str, conn: &mut SqliteConnection) -> Result<User, sqlx::Error> {
    let user: User = sqlx::query_as(
        r#"
            INSERT INTO users (email, password_hash, is_admin)
            VALUES ($1, $2, NOT EXISTS (SELECT 1 FROM users))
            RETURNING *;
        "#,
    )
    .bind(email)
    .bind(password_hash)
    .fetch_one(conn)
    .await?;
    if user.is_admin {
        info!("🗃️ {} is the first registered user and has been made an admin", user.email);
    }
    Ok(user)
}

pub async fn fetch_user_by_email(email: &str, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE email = $1").bind(email).fetch_optional(conn).await
}

pub async fn fetch_user_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_all_users(conn: &mut SqliteConnection) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users ORDER BY id ASC").fetch_all(conn).await
}
