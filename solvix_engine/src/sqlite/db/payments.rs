use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqliteConnection};

use crate::{
    db_types::{NewPayment, Payment, PaymentStatus},
    traits::OrderFlowError,
};

impl FromRow<'_, SqliteRow> for Payment {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let metadata: String = row.try_get("metadata")?;
        let metadata = serde_json::from_str(&metadata)
            .map_err(|e| sqlx::Error::ColumnDecode { index: "metadata".into(), source: Box::new(e) })?;
        Ok(Payment {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            correlation_id: row.try_get("correlation_id")?,
            amount: row.try_get("amount")?,
            status: row.try_get("status")?,
            payment_provider: row.try_get("payment_provider")?,
            provider_order_id: row.try_get("provider_order_id")?,
            customer_email: row.try_get("customer_email")?,
            metadata,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Inserts the payment, unless a record for the same provider reference exists already. In that case the existing
/// record is returned unchanged, with `false` in the second position.
pub async fn idempotent_insert(
    payment: NewPayment,
    conn: &mut SqliteConnection,
) -> Result<(Payment, bool), OrderFlowError> {
    let inserted: Option<Payment> = sqlx::query_as(
        r#"
            INSERT INTO payments (
                order_id,
                correlation_id,
                amount,
                status,
                payment_provider,
                provider_order_id,
                customer_email,
                metadata
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (payment_provider, provider_order_id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(payment.order_id)
    .bind(&payment.correlation_id)
    .bind(payment.amount)
    .bind(payment.status)
    .bind(&payment.payment_provider)
    .bind(&payment.provider_order_id)
    .bind(&payment.customer_email)
    .bind(payment.metadata.to_string())
    .fetch_optional(&mut *conn)
    .await?;
    match inserted {
        Some(p) => {
            debug!("🗃️ Payment {}:{} saved with id {}", p.payment_provider, p.provider_order_id, p.id);
            Ok((p, true))
        },
        None => {
            trace!("🗃️ Payment {}:{} already exists", payment.payment_provider, payment.provider_order_id);
            let existing = fetch_by_provider_ref(&payment.payment_provider, &payment.provider_order_id, conn)
                .await?
                .ok_or_else(|| OrderFlowError::PaymentNotFound(payment.provider_order_id.clone()))?;
            Ok((existing, false))
        },
    }
}

pub async fn fetch_by_provider_ref(
    provider: &str,
    provider_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE payment_provider = $1 AND provider_order_id = $2")
        .bind(provider)
        .bind(provider_order_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

pub async fn fetch_latest_for_correlation_id(
    correlation_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment =
        sqlx::query_as("SELECT * FROM payments WHERE correlation_id = $1 ORDER BY updated_at DESC, id DESC LIMIT 1")
            .bind(correlation_id)
            .fetch_optional(conn)
            .await?;
    Ok(payment)
}

pub async fn fetch_payments_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Payment>, sqlx::Error> {
    let payments = sqlx::query_as("SELECT * FROM payments WHERE order_id = $1 ORDER BY created_at ASC, id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(payments)
}

pub(crate) async fn update_status(
    id: i64,
    status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Payment, OrderFlowError> {
    let payment: Option<Payment> =
        sqlx::query_as("UPDATE payments SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status)
            .bind(id)
            .fetch_optional(conn)
            .await?;
    payment.ok_or_else(|| OrderFlowError::PaymentNotFound(id.to_string()))
}
