//! # Solvix engine public API
//!
//! The `api` module exposes the programmatic API for the engine. It is split by concern so that callers only pull in
//! the backend behaviour they actually need:
//!
//! * [`order_flow_api`] is the order lifecycle manager. It is the only way to create orders, change their status,
//!   attach requirements and record payment outcomes.
//! * [`order_query_api`] reads orders and payment records on behalf of an [`Actor`](crate::db_types::Actor), applying
//!   ownership rules.
//! * [`notification_api`] serves user mailboxes and drains the notification outbox.
//! * [`user_api`] registers and authenticates storefront users.
//! * [`catalog_api`] serves the service catalogue.
//!
//! # API usage
//!
//! Every API is created by handing it a backend that implements the traits it needs:
//!
//! ```rust,ignore
//! use solvix_engine::{OrderQueryApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/solvix.db", 5).await?;
//! let api = OrderQueryApi::new(db);
//! let orders = api.orders_for_actor(&actor).await?;
//! ```
pub mod catalog_api;
pub mod notification_api;
pub mod order_flow_api;
pub mod order_query_api;
pub mod payment_objects;
pub mod user_api;
