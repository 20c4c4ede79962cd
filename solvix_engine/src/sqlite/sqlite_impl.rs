//! `SqliteDatabase` is a concrete implementation of a Solvix engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, new_pool, notifications, orders, payments, services, users};
use crate::{
    api::payment_objects::PaymentReport,
    db_types::{
        NewNotification,
        NewOrder,
        NewPayment,
        NewService,
        Notification,
        Order,
        OrderStatusType,
        OutboxEntry,
        Payment,
        PaymentStatus,
        RequirementsDocument,
        Service,
        User,
    },
    traits::{
        CatalogManagement,
        NotificationManagement,
        OrderFlowError,
        OrderLifecycleDatabase,
        OrderQueries,
        PaymentReportResult,
        UserApiError,
        UserManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in the `SOLVIX_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    /// Applies any outstanding schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&mut self) -> Result<(), sqlx::Error> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderLifecycleDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order_with_admin_notices(&self, order: NewOrder) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        let queued = orders::queue_admin_notices(order.id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order #{} saved. {queued} admin notices queued", order.id);
        Ok(order)
    }

    async fn compare_and_set_status(
        &self,
        order_id: i64,
        expected: OrderStatusType,
        target: OrderStatusType,
        notification: NewNotification,
    ) -> Result<Option<Order>, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let updated = orders::compare_and_set_status(order_id, expected, target, &mut tx).await?;
        let Some(order) = updated else {
            trace!("🗃️ Order #{order_id} is no longer {expected}. Status not changed");
            tx.rollback().await?;
            return Ok(None);
        };
        notifications::insert_notification(notification, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order #{order_id} moved from {expected} to {target} (version {})", order.version);
        Ok(Some(order))
    }

    async fn update_requirements(
        &self,
        order_id: i64,
        requirements: &RequirementsDocument,
    ) -> Result<Order, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::update_requirements(order_id, requirements, &mut conn).await?;
        debug!("🗃️ Requirements for order #{order_id} replaced");
        Ok(order)
    }

    async fn apply_payment_report(&self, report: &PaymentReport) -> Result<PaymentReportResult, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let existing = payments::fetch_by_provider_ref(&report.provider, &report.provider_order_id, &mut tx).await?;
        let order_id = existing
            .as_ref()
            .and_then(|p| p.order_id)
            .or(report.order_id)
            .ok_or_else(|| OrderFlowError::PaymentNotFound(report.provider_order_id.clone()))?;
        let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        let (payment, previous_status) = match existing {
            Some(p) => {
                let status = p.status;
                (p, Some(status))
            },
            None => {
                let new_payment = NewPayment {
                    order_id: Some(order.id),
                    correlation_id: order.id.to_string(),
                    amount: report.amount.unwrap_or(order.total_price),
                    status: PaymentStatus::Pending,
                    payment_provider: report.provider.clone(),
                    provider_order_id: report.provider_order_id.clone(),
                    customer_email: report.customer_email.clone(),
                    metadata: report.metadata.clone(),
                };
                let (p, _) = payments::idempotent_insert(new_payment, &mut tx).await?;
                debug!("🗃️ No payment record for {} existed. Created #{}", report.provider_order_id, p.id);
                (p, None)
            },
        };
        let Some(new_status) = payment.status.apply_outcome(report.outcome) else {
            tx.commit().await?;
            return Ok(PaymentReportResult { order, payment, previous_status, changed: false });
        };
        let payment = payments::update_status(payment.id, new_status, &mut tx).await?;
        let order = orders::update_payment_state(order.id, new_status.payment_state(), &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Payment #{} is now {new_status}. Order #{} payment state is {}", payment.id, order.id, order.payment_state);
        Ok(PaymentReportResult { order, payment, previous_status, changed: true })
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<(Payment, bool), OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        payments::idempotent_insert(payment, &mut conn).await
    }
}

impl OrderQueries for SqliteDatabase {
    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order(order_id, &mut conn).await?)
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_orders_for_user(user_id, &mut conn).await?)
    }

    async fn fetch_all_orders(&self) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_all_orders(&mut conn).await?)
    }

    async fn fetch_latest_payment(&self, correlation_id: &str) -> Result<Option<Payment>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_latest_for_correlation_id(correlation_id, &mut conn).await?)
    }

    async fn fetch_payments_for_order(&self, order_id: i64) -> Result<Vec<Payment>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payments_for_order(order_id, &mut conn).await?)
    }
}

impl NotificationManagement for SqliteDatabase {
    async fn fetch_notifications_for_user(&self, user_id: i64) -> Result<Vec<Notification>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(notifications::fetch_notifications_for_user(user_id, &mut conn).await?)
    }

    async fn mark_notification_read(
        &self,
        notification_id: i64,
        user_id: i64,
    ) -> Result<Option<Notification>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(notifications::mark_read(notification_id, user_id, &mut conn).await?)
    }

    async fn fetch_outbox_batch(&self, limit: i64) -> Result<Vec<OutboxEntry>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(notifications::fetch_outbox_batch(limit, &mut conn).await?)
    }

    async fn deliver_outbox_entry(&self, entry_id: i64) -> Result<Option<Notification>, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let Some(entry) = notifications::take_outbox_entry(entry_id, &mut tx).await? else {
            tx.rollback().await?;
            return Ok(None);
        };
        let note = NewNotification { user_id: entry.user_id, title: entry.title, message: entry.message };
        let notification = notifications::insert_notification(note, &mut tx).await?;
        tx.commit().await?;
        Ok(Some(notification))
    }

    async fn record_outbox_failure(&self, entry_id: i64) -> Result<(), OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let attempts = notifications::increment_outbox_attempts(entry_id, &mut conn).await?;
        if attempts.is_some_and(|n| n >= notifications::MAX_OUTBOX_ATTEMPTS) {
            let max = notifications::MAX_OUTBOX_ATTEMPTS;
            error!("🗃️ Outbox entry #{entry_id} failed {max} times and will not be retried");
        }
        Ok(())
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn fetch_services(&self) -> Result<Vec<Service>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(services::fetch_services(&mut conn).await?)
    }

    async fn fetch_service(&self, service_id: i64) -> Result<Option<Service>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(services::fetch_service(service_id, &mut conn).await?)
    }

    async fn insert_service(&self, service: NewService) -> Result<Service, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let service = services::insert_service(service, &mut conn).await?;
        debug!("🗃️ Service #{} ({}) added to the catalogue", service.id, service.name);
        Ok(service)
    }
}

impl UserManagement for SqliteDatabase {
    async fn insert_user(&self, email: &str, password_hash: &str) -> Result<User, UserApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::insert_user(email, password_hash, &mut conn).await?)
    }

    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, UserApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::fetch_user_by_email(email, &mut conn).await?)
    }

    async fn fetch_user_by_id(&self, user_id: i64) -> Result<Option<User>, UserApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::fetch_user_by_id(user_id, &mut conn).await?)
    }

    async fn fetch_all_users(&self) -> Result<Vec<User>, UserApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::fetch_all_users(&mut conn).await?)
    }
}
