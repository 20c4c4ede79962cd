use sqlx::SqliteConnection;

use crate::db_types::{NewService, Service};

pub async fn fetch_services(conn: &mut SqliteConnection) -> Result<Vec<Service>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM services ORDER BY id ASC").fetch_all(conn).await
}

pub async fn fetch_service(id: i64, conn: &mut SqliteConnection) -> Result<Option<Service>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM services WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn insert_service(service: NewService, conn: &mut SqliteConnection) -> Result<Service, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO services (name, description, base_price, service_type, features)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(service.name)
    .bind(service.description)
    .bind(service.base_price)
    .bind(service.service_type)
    .bind(service.features)
    .fetch_one(conn)
    .await
}
