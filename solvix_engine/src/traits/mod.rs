//! # Backend contracts
//!
//! The traits in this module define what a storage backend must provide to drive the Solvix engine. The engine APIs
//! (see [`crate::api`]) are generic over these traits, so tests can swap in mocks and other databases can be added
//! without touching the lifecycle rules.
//!
//! * [`OrderLifecycleDatabase`] performs the atomic writes behind order creation, status changes, requirements and
//!   payment outcomes.
//! * [`OrderQueries`] is the read side for orders and payment records.
//! * [`NotificationManagement`] owns the per-user mailbox and the notification outbox.
//! * [`CatalogManagement`] reads and writes the service catalogue.
//! * [`UserManagement`] stores storefront users.
mod catalog_management;
mod data_objects;
mod notification_management;
mod order_lifecycle;
mod order_queries;
mod user_management;

pub use catalog_management::CatalogManagement;
pub use data_objects::{DrainResult, PaymentReportResult};
pub use notification_management::NotificationManagement;
pub use order_lifecycle::{OrderFlowError, OrderLifecycleDatabase};
pub use order_queries::OrderQueries;
pub use user_management::{UserApiError, UserManagement};
