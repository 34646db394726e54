//! Payment record storage. The unique `gateway_reference` column is the idempotence key: inserts map a
//! uniqueness violation to a typed duplicate error, and the terminal-status update is conditional so a payment
//! settles at most once no matter how many callbacks race.

use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPayment, Payment, PaymentStatusType},
    traits::MarketplaceError,
};

pub async fn insert_payment(payment: NewPayment, conn: &mut SqliteConnection) -> Result<Payment, MarketplaceError> {
    let reference = payment.gateway_reference.clone();
    let payment = sqlx::query_as(
        r#"
            INSERT INTO payments (gateway_reference, order_id, amount, currency)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(payment.gateway_reference)
    .bind(payment.order_id.map(|oid| oid.0))
    .bind(payment.amount)
    .bind(payment.currency)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => MarketplaceError::PaymentAlreadyExists(reference),
        e => MarketplaceError::from(e),
    })?;
    Ok(payment)
}

pub async fn fetch_payment(reference: &str, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE gateway_reference = $1")
        .bind(reference)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

/// Moves the payment to a terminal status, guarded against racing callbacks.
///
/// The `WHERE status IN ('Pending', 'Processing')` clause means only one of two concurrent settlements for the
/// same reference can match; the loser gets `None` and reports a duplicate.
pub async fn settle_checked(
    reference: &str,
    status: PaymentStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        "UPDATE payments SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE gateway_reference = $2 AND status IN \
         ('Pending', 'Processing') RETURNING *",
    )
    .bind(status.to_string())
    .bind(reference)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

pub async fn set_status(
    reference: &str,
    status: PaymentStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        "UPDATE payments SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE gateway_reference = $2 RETURNING *",
    )
    .bind(status.to_string())
    .bind(reference)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

/// Finds `Completed` payments whose linked order does not show a completed payment yet.
///
/// A crash between the payment write and the order write strands the order in this state; the reconciliation
/// sweep re-drives it.
pub async fn fetch_stranded(conn: &mut SqliteConnection) -> Result<Vec<Payment>, sqlx::Error> {
    let stranded: Vec<Payment> = sqlx::query_as(
        r#"
            SELECT payments.* FROM payments
            JOIN orders ON orders.order_id = payments.order_id
            WHERE payments.status = 'Completed' AND orders.payment_status != 'Completed'
        "#,
    )
    .fetch_all(conn)
    .await?;
    if !stranded.is_empty() {
        warn!("💳️ Found {} stranded payment(s) awaiting order repair", stranded.len());
    }
    Ok(stranded)
}
