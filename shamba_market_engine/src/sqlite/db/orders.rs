//! Order storage: placement (with inventory reservation), lookups, the status audit log and the conditional
//! status updates that serialize concurrent transitions.

use log::*;
use smp_common::Money;
use sqlx::{QueryBuilder, SqliteConnection};

use super::items;
use crate::{
    db_types::{
        ActorRole,
        FullOrder,
        NewOrderRequest,
        Order,
        OrderId,
        OrderLine,
        OrderStatusEntry,
        OrderStatusType,
        PaymentStatusType,
    },
    order_objects::OrderQueryFilter,
    traits::MarketplaceError,
};

/// Reserves stock for every cart line and writes the order, its line snapshots and the opening audit entry.
///
/// Must be called inside a transaction: the first failing line aborts the whole call, and rolling the
/// transaction back undoes every reservation made by the lines before it. No partially-reserved order can ever
/// be observed.
pub async fn insert_order(
    request: NewOrderRequest,
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<FullOrder, MarketplaceError> {
    let mut seller_id: Option<String> = None;
    let mut snapshots = Vec::with_capacity(request.lines.len());
    for line in &request.lines {
        let item = items::reserve(&line.item_id, line.quantity, &mut *conn).await?;
        match &seller_id {
            None => seller_id = Some(item.owner_id.clone()),
            Some(seller) if *seller != item.owner_id => {
                return Err(MarketplaceError::MixedSellerCart { item_id: line.item_id.clone() });
            },
            Some(_) => {},
        }
        snapshots.push((item, line.quantity));
    }
    // A non-empty cart is checked upstream, so seller_id is always set by now.
    let seller_id = seller_id.ok_or(MarketplaceError::EmptyCart)?;

    let subtotal: Money = snapshots.iter().map(|(item, qty)| item.unit_price * *qty).sum();
    let total = subtotal + request.delivery_fee + request.tax - request.discount;
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id, buyer_id, seller_id, payment_method,
                subtotal, delivery_fee, tax, discount, total,
                delivery_address, delivery_method, notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .bind(&request.buyer_id)
    .bind(&seller_id)
    .bind(request.payment_method.to_string())
    .bind(subtotal)
    .bind(request.delivery_fee)
    .bind(request.tax)
    .bind(request.discount)
    .bind(total)
    .bind(&request.delivery_address)
    .bind(&request.delivery_method)
    .bind(&request.notes)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            MarketplaceError::OrderAlreadyExists(order_id.clone())
        },
        e => MarketplaceError::from(e),
    })?;

    let mut lines = Vec::with_capacity(snapshots.len());
    for (item, quantity) in snapshots {
        let line: OrderLine = sqlx::query_as(
            r#"
                INSERT INTO order_lines (order_id, item_id, name, category, unit, image_url, unit_price, quantity, line_total)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING *;
            "#,
        )
        .bind(order_id.as_str())
        .bind(item.id)
        .bind(item.name)
        .bind(item.category)
        .bind(item.unit)
        .bind(item.image_url)
        .bind(item.unit_price)
        .bind(quantity)
        .bind(item.unit_price * quantity)
        .fetch_one(&mut *conn)
        .await?;
        lines.push(line);
    }
    append_status_log(order_id, OrderStatusType::Pending, ActorRole::Buyer, Some("Order placed"), conn).await?;
    debug!("📝️ Order {order_id} inserted for buyer {} with {} lines, total {}", order.buyer_id, lines.len(), order.total);
    Ok(FullOrder { order, lines })
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_lines_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderLine>, sqlx::Error> {
    let lines = sqlx::query_as("SELECT * FROM order_lines WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(lines)
}

pub async fn fetch_status_log(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderStatusEntry>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM order_status_log WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(entries)
}

/// Fetches orders according to the criteria in the `OrderQueryFilter`, ordered by `created_at` ascending.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_id) = query.order_id {
        where_clause.push("order_id = ");
        where_clause.push_bind_unseparated(order_id.to_string());
    }
    if let Some(buyer_id) = query.buyer_id {
        where_clause.push("buyer_id = ");
        where_clause.push_bind_unseparated(buyer_id);
    }
    if let Some(seller_id) = query.seller_id {
        where_clause.push("seller_id = ");
        where_clause.push_bind_unseparated(seller_id);
    }
    if query.status.as_ref().map(|s| !s.is_empty()).unwrap_or(false) {
        let statuses =
            query.status.as_ref().unwrap().iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(",");
        where_clause.push(format!("status IN ({statuses})"));
    }
    if let Some(payment_status) = query.payment_status {
        where_clause.push("payment_status = ");
        where_clause.push_bind_unseparated(payment_status.to_string());
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at ASC");
    trace!("📝️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    Ok(orders)
}

/// Applies a status change conditioned on the expected current status.
///
/// The `status = expected` guard is the optimistic version check that serializes racing transitions for the
/// same order: the loser matches zero rows and gets `None`, never a lost update. The caller has already
/// validated the transition against the legal graph.
pub async fn update_status_checked(
    order_id: &OrderId,
    expected: OrderStatusType,
    new_status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        "UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $2 AND status = $3 \
         RETURNING *",
    )
    .bind(new_status.to_string())
    .bind(order_id.as_str())
    .bind(expected.to_string())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Stamps the completion timestamp when an order reaches `Delivered`.
pub async fn stamp_delivered(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        "UPDATE orders SET delivered_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP WHERE order_id = $1 \
         RETURNING *",
    )
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Cancels the order, conditioned on the expected current status, stamping the cancellation metadata in the
/// same statement. Stock release and the audit entry are the caller's responsibility (same transaction).
pub async fn cancel_checked(
    order_id: &OrderId,
    expected: OrderStatusType,
    reason: &str,
    actor: ActorRole,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = 'Cancelled',
                cancelled_reason = $1,
                cancelled_by = $2,
                cancelled_at = CURRENT_TIMESTAMP,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $3 AND status = $4
            RETURNING *;
        "#,
    )
    .bind(reason)
    .bind(actor.to_string())
    .bind(order_id.as_str())
    .bind(expected.to_string())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn set_payment_status(
    order_id: &OrderId,
    status: PaymentStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        "UPDATE orders SET payment_status = $1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $2 RETURNING *",
    )
    .bind(status.to_string())
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn set_gateway_reference(
    order_id: &OrderId,
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        "UPDATE orders SET gateway_reference = $1, payment_status = 'Processing', updated_at = CURRENT_TIMESTAMP \
         WHERE order_id = $2 RETURNING *",
    )
    .bind(reference)
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Appends one row to the order's append-only audit log.
pub async fn append_status_log(
    order_id: &OrderId,
    status: OrderStatusType,
    actor: ActorRole,
    note: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO order_status_log (order_id, status, actor, note) VALUES ($1, $2, $3, $4)")
        .bind(order_id.as_str())
        .bind(status.to_string())
        .bind(actor.to_string())
        .bind(note)
        .execute(conn)
        .await?;
    Ok(())
}
