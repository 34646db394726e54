//! Delivery storage: the logistics extension's own state machine rows, the append-only tracking log and
//! cold-chain telemetry.

use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{
        ColdChainAlert,
        Delivery,
        DeliveryId,
        DeliveryStatusType,
        NewDelivery,
        NewTelemetry,
        TrackingEvent,
    },
    traits::MarketplaceError,
};

pub async fn insert_delivery(
    delivery: NewDelivery,
    delivery_id: &DeliveryId,
    conn: &mut SqliteConnection,
) -> Result<Delivery, MarketplaceError> {
    let order_id = delivery.order_id.clone();
    let (required, min_t, max_t) = match delivery.cold_chain {
        Some(band) => (true, Some(band.min_temperature), Some(band.max_temperature)),
        None => (false, None, None),
    };
    let delivery = sqlx::query_as(
        r#"
            INSERT INTO deliveries (delivery_id, order_id, courier_id, cold_chain_required, min_temperature, max_temperature)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(delivery_id.as_str())
    .bind(delivery.order_id.0)
    .bind(delivery.courier_id)
    .bind(required)
    .bind(min_t)
    .bind(max_t)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => MarketplaceError::DeliveryAlreadyExists(order_id),
        e => MarketplaceError::from(e),
    })?;
    Ok(delivery)
}

pub async fn fetch_delivery(
    delivery_id: &DeliveryId,
    conn: &mut SqliteConnection,
) -> Result<Option<Delivery>, sqlx::Error> {
    let delivery = sqlx::query_as("SELECT * FROM deliveries WHERE delivery_id = $1")
        .bind(delivery_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(delivery)
}

/// Applies a delivery status change conditioned on the expected current status, mirroring the optimistic
/// guard used for orders.
pub async fn update_status_checked(
    delivery_id: &DeliveryId,
    expected: DeliveryStatusType,
    new_status: DeliveryStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Delivery>, sqlx::Error> {
    let delivery = sqlx::query_as(
        "UPDATE deliveries SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE delivery_id = $2 AND status = $3 \
         RETURNING *",
    )
    .bind(new_status.to_string())
    .bind(delivery_id.as_str())
    .bind(expected.to_string())
    .fetch_optional(conn)
    .await?;
    Ok(delivery)
}

pub async fn stamp_actual_delivery(
    delivery_id: &DeliveryId,
    conn: &mut SqliteConnection,
) -> Result<Option<Delivery>, sqlx::Error> {
    let delivery = sqlx::query_as(
        "UPDATE deliveries SET actual_delivery = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP WHERE \
         delivery_id = $1 RETURNING *",
    )
    .bind(delivery_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(delivery)
}

/// Appends one row to the delivery's append-only tracking log.
pub async fn append_tracking_event(
    delivery_id: &DeliveryId,
    event: &str,
    location: Option<&str>,
    notes: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<TrackingEvent, sqlx::Error> {
    let event = sqlx::query_as(
        "INSERT INTO tracking_events (delivery_id, event, location, notes) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(delivery_id.as_str())
    .bind(event)
    .bind(location)
    .bind(notes)
    .fetch_one(conn)
    .await?;
    Ok(event)
}

pub async fn fetch_tracking_events(
    delivery_id: &DeliveryId,
    conn: &mut SqliteConnection,
) -> Result<Vec<TrackingEvent>, sqlx::Error> {
    let events = sqlx::query_as("SELECT * FROM tracking_events WHERE delivery_id = $1 ORDER BY id ASC")
        .bind(delivery_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(events)
}

/// Stores a telemetry sample and, when the delivery is cold-chain monitored and the reading falls outside the
/// configured band, writes an informational alert row. Alerts never block anything.
pub async fn record_telemetry(
    delivery: &Delivery,
    sample: NewTelemetry,
    conn: &mut SqliteConnection,
) -> Result<Option<ColdChainAlert>, sqlx::Error> {
    sqlx::query("INSERT INTO telemetry_samples (delivery_id, temperature, humidity) VALUES ($1, $2, $3)")
        .bind(delivery.delivery_id.as_str())
        .bind(sample.temperature)
        .bind(sample.humidity)
        .execute(&mut *conn)
        .await?;
    if !delivery.cold_chain_required {
        return Ok(None);
    }
    let breach = match (delivery.min_temperature, delivery.max_temperature) {
        (Some(min), _) if sample.temperature < min => Some(format!(
            "Temperature {:.1}°C is below the minimum of {min:.1}°C",
            sample.temperature
        )),
        (_, Some(max)) if sample.temperature > max => Some(format!(
            "Temperature {:.1}°C is above the maximum of {max:.1}°C",
            sample.temperature
        )),
        _ => None,
    };
    let Some(message) = breach else {
        return Ok(None);
    };
    warn!("🧊️ Cold chain breach on delivery {}: {message}", delivery.delivery_id);
    let alert = sqlx::query_as(
        "INSERT INTO cold_chain_alerts (delivery_id, message, temperature) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(delivery.delivery_id.as_str())
    .bind(message)
    .bind(sample.temperature)
    .fetch_one(conn)
    .await?;
    Ok(Some(alert))
}

pub async fn fetch_alerts(
    delivery_id: &DeliveryId,
    conn: &mut SqliteConnection,
) -> Result<Vec<ColdChainAlert>, sqlx::Error> {
    let alerts = sqlx::query_as("SELECT * FROM cold_chain_alerts WHERE delivery_id = $1 ORDER BY id ASC")
        .bind(delivery_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(alerts)
}
