//! Solvix Engine
//!
//! The Solvix engine holds the order lifecycle rules of the Solvix storefront: which status changes are legal, who gets
//! told about them, and how payment provider reports land on an order. It knows nothing about HTTP or any specific
//! payment provider.
//!
//! The library is divided into three main sections:
//! 1. Backend contracts ([`mod@traits`]) and the SQLite implementation of them ([`SqliteDatabase`]). You should never
//!    need to touch the database directly. The exception is the data types stored in it, which live in
//!    [`mod@db_types`] and are public.
//! 2. The engine public API ([`mod@api`]). [`OrderFlowApi`] is the single authority for mutating orders. The other
//!    APIs are read-mostly and apply ownership rules on behalf of the caller.
//! 3. Events ([`mod@events`]). The engine emits an event when an order is created, when its status changes and when a
//!    payment outcome is recorded. Hooks run on their own tasks and cannot affect the operation that raised them.
pub mod api;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{
    catalog_api::CatalogApi,
    notification_api::NotificationApi,
    order_flow_api::OrderFlowApi,
    order_query_api::OrderQueryApi,
    payment_objects,
    user_api::UserApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    CatalogManagement,
    DrainResult,
    NotificationManagement,
    OrderFlowError,
    OrderLifecycleDatabase,
    OrderQueries,
    PaymentReportResult,
    UserApiError,
    UserManagement,
};
