use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqliteConnection};

use crate::{
    db_types::{new_order_notice, NewOrder, Order, OrderStatusType, PaymentState, RequirementsDocument},
    traits::OrderFlowError,
};

impl FromRow<'_, SqliteRow> for Order {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let requirements = row
            .try_get::<Option<String>, _>("requirements_json")?
            .map(|json| serde_json::from_str::<RequirementsDocument>(&json))
            .transpose()
            .map_err(|e| sqlx::Error::ColumnDecode { index: "requirements_json".into(), source: Box::new(e) })?;
        Ok(Order {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            service_id: row.try_get("service_id")?,
            status: row.try_get("status")?,
            payment_state: row.try_get("payment_state")?,
            total_price: row.try_get("total_price")?,
            requirements,
            version: row.try_get("version")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

fn requirements_to_json(doc: &RequirementsDocument) -> Result<String, OrderFlowError> {
    serde_json::to_string(doc).map_err(|e| OrderFlowError::ValidationError(format!("Requirements not storable. {e}")))
}

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
///
/// New orders always start out `pending` and `unverified`; the column defaults take care of that.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderFlowError> {
    let requirements = order.requirements.as_ref().map(requirements_to_json).transpose()?;
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (user_id, service_id, total_price, requirements_json)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(order.user_id)
    .bind(order.service_id)
    .bind(order.total_price)
    .bind(requirements)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order #{} inserted for user #{}", order.id, order.user_id);
    Ok(order)
}

/// Appends a "new order" outbox entry for every admin user. Returns the number of entries written.
pub async fn queue_admin_notices(order_id: i64, conn: &mut SqliteConnection) -> Result<u64, OrderFlowError> {
    let (title, message) = new_order_notice(order_id);
    let result = sqlx::query(
        r#"
            INSERT INTO notification_outbox (user_id, title, message)
            SELECT id, $1, $2 FROM users WHERE is_admin = 1;
        "#,
    )
    .bind(title)
    .bind(message)
    .execute(conn)
    .await?;
    trace!("🗃️ {} admin notices queued for order #{order_id}", result.rows_affected());
    Ok(result.rows_affected())
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

pub async fn fetch_all_orders(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders ORDER BY created_at DESC, id DESC").fetch_all(conn).await?;
    Ok(orders)
}

/// Sets the status to `target` only if the order is currently in `expected` status. Bumps the version on success.
pub(crate) async fn compare_and_set_status(
    id: i64,
    expected: OrderStatusType,
    target: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, version = version + 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = $3
            RETURNING *;
        "#,
    )
    .bind(target)
    .bind(id)
    .bind(expected)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub(crate) async fn update_requirements(
    id: i64,
    requirements: &RequirementsDocument,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderFlowError> {
    let json = requirements_to_json(requirements)?;
    let order: Option<Order> = sqlx::query_as(
        "UPDATE orders SET requirements_json = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(json)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    order.ok_or(OrderFlowError::OrderNotFound(id))
}

pub(crate) async fn update_payment_state(
    id: i64,
    state: PaymentState,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderFlowError> {
    let order: Option<Order> = sqlx::query_as(
        "UPDATE orders SET payment_state = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(state)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    order.ok_or(OrderFlowError::OrderNotFound(id))
}
