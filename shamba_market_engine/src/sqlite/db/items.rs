//! Inventory storage. The reserve and release operations here are the only legitimate ways stock moves;
//! order placement and cancellation are their only callers.

use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Item, ItemId, ItemStatus, NewItem},
    traits::MarketplaceError,
};

pub async fn insert_item(item: NewItem, conn: &mut SqliteConnection) -> Result<Item, MarketplaceError> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO items (id, owner_id, name, category, unit, image_url, unit_price, quantity, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(item.id)
    .bind(item.owner_id)
    .bind(item.name)
    .bind(item.category)
    .bind(item.unit)
    .bind(item.image_url)
    .bind(item.unit_price)
    .bind(item.quantity)
    .bind(item.status.to_string())
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_item(item_id: &ItemId, conn: &mut SqliteConnection) -> Result<Option<Item>, sqlx::Error> {
    let item = sqlx::query_as("SELECT * FROM items WHERE id = $1").bind(item_id.as_str()).fetch_optional(conn).await?;
    Ok(item)
}

/// Reserves `quantity` units of the item with a single conditional decrement.
///
/// The guard (`status = 'Available' AND quantity >= $1`) and the decrement execute as one atomic statement, so
/// concurrent reservations against the same item can never jointly overdraw it. When the last unit goes, the
/// item flips to `SoldOut` in the same statement.
///
/// Returns the updated item row (which doubles as the snapshot source for the order line). If no row matched,
/// a follow-up fetch classifies the failure.
pub async fn reserve(item_id: &ItemId, quantity: i64, conn: &mut SqliteConnection) -> Result<Item, MarketplaceError> {
    let reserved: Option<Item> = sqlx::query_as(
        r#"
            UPDATE items SET
                quantity = quantity - $1,
                status = CASE WHEN quantity - $1 <= 0 THEN 'SoldOut' ELSE status END,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = 'Available' AND quantity >= $1
            RETURNING *;
        "#,
    )
    .bind(quantity)
    .bind(item_id.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    match reserved {
        Some(item) => {
            trace!("🌽️ Reserved {quantity} x item {item_id}. {} left", item.quantity);
            Ok(item)
        },
        None => match fetch_item(item_id, conn).await? {
            None => Err(MarketplaceError::ItemNotFound(item_id.clone())),
            Some(item) if !item.status.is_sellable() => Err(MarketplaceError::ItemUnavailable {
                item_id: item_id.clone(),
                name: item.name,
                status: item.status,
            }),
            Some(item) => Err(MarketplaceError::InsufficientStock {
                item_id: item_id.clone(),
                name: item.name,
                requested: quantity,
                available: item.quantity,
            }),
        },
    }
}

/// Returns `quantity` units to the item, restoring `Available` from `SoldOut`.
///
/// A release against a deleted item is a logged anomaly and a no-op: the stock can no longer be resold, but a
/// missing listing must never block the cancellation that triggered the release.
pub async fn release(item_id: &ItemId, quantity: i64, conn: &mut SqliteConnection) -> Result<(), MarketplaceError> {
    let released: Option<Item> = sqlx::query_as(
        r#"
            UPDATE items SET
                quantity = quantity + $1,
                status = CASE WHEN status = 'SoldOut' THEN 'Available' ELSE status END,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status != 'Deleted'
            RETURNING *;
        "#,
    )
    .bind(quantity)
    .bind(item_id.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    match released {
        Some(item) => {
            trace!("🌽️ Released {quantity} x item {item_id}. {} now available", item.quantity);
            Ok(())
        },
        None => {
            match fetch_item(item_id, conn).await? {
                None => warn!("🌽️ Tried to release {quantity} x item {item_id}, but the item no longer exists."),
                Some(item) if item.status == ItemStatus::Deleted => warn!(
                    "🌽️ Released {quantity} x item {item_id} against a deleted listing. The stock cannot be resold."
                ),
                Some(_) => warn!("🌽️ Release of {quantity} x item {item_id} did not match any row."),
            }
            Ok(())
        },
    }
}
