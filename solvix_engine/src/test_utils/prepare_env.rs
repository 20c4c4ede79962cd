use std::env::temp_dir;

use log::*;
use solvix_common::Cents;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{
    db_types::{NewService, Service, User},
    helpers::hash_password,
    traits::{CatalogManagement, OrderLifecycleDatabase, UserManagement},
    SqliteDatabase,
};

pub const TEST_PASSWORD: &str = "correct horse battery";

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

/// A fresh database file in the system temp folder, so tests never share state.
pub fn random_db_url() -> String {
    let path = temp_dir().join(format!("solvix_test_{}.db", rand::random::<u64>()));
    format!("sqlite://{}", path.display())
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
}

pub async fn create_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        trace!("Could not drop database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("🚀️ Created Sqlite database {url}");
}

/// Creates a migrated database and returns a handle to it.
pub async fn fresh_database() -> SqliteDatabase {
    let url = random_db_url();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

pub async fn tear_down(mut db: SqliteDatabase) {
    let url = db.url().to_string();
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("🚀️ Failed to drop test database {url}: {e}");
    }
}

/// Stores a user with [`TEST_PASSWORD`]. Remember that the first user seeded into a database is an admin.
pub async fn seed_user(db: &SqliteDatabase, email: &str) -> User {
    let hash = hash_password(TEST_PASSWORD).expect("Error hashing password");
    db.insert_user(email, &hash).await.expect("Error seeding user")
}

pub async fn seed_service(db: &SqliteDatabase, name: &str, price: i64) -> Service {
    let service = NewService {
        name: name.to_string(),
        description: format!("{name} for testing"),
        base_price: Cents::from(price),
        service_type: "web".to_string(),
        features: None,
    };
    db.insert_service(service).await.expect("Error seeding service")
}
