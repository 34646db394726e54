//! `SqliteDatabase` is the concrete SQLite backend for the marketplace engine.
//!
//! Every multi-step flow here runs inside a single sqlx transaction, so the consistency-critical sequences
//! (reserve-per-line then write order; release-per-line then stamp cancellation; settle payment then update
//! order) either land completely or not at all.

use std::fmt::Debug;

use log::*;
use smp_common::Money;
use sqlx::SqlitePool;

use super::db::{db_url, deliveries, items, new_pool, orders, payments};
use crate::{
    db_types::{
        ActorRole,
        ColdChainAlert,
        Delivery,
        DeliveryId,
        DeliveryStatusType,
        FullOrder,
        Item,
        ItemId,
        NewDelivery,
        NewItem,
        NewOrderRequest,
        NewPayment,
        NewTelemetry,
        Order,
        OrderId,
        OrderStatusEntry,
        OrderStatusType,
        Payment,
        PaymentStatusType,
        SettlementOutcome,
        TrackingEvent,
    },
    helpers::{new_delivery_id, new_order_id},
    order_objects::OrderQueryFilter,
    traits::{CatalogManagement, MarketplaceDatabase, MarketplaceError, ReconciliationOutcome},
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
    /// Creates a new database API object using the URL from the environment.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Marks the order paid and, if it is still `Pending`, confirms it. Idempotent; used both by live
    /// settlement and by the stranded-order repair sweep.
    async fn apply_successful_settlement(
        order: &Order,
        conn: &mut sqlx::SqliteConnection,
    ) -> Result<Order, MarketplaceError> {
        let mut updated = orders::set_payment_status(&order.order_id, PaymentStatusType::Completed, &mut *conn)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(order.order_id.clone()))?;
        if updated.status == OrderStatusType::Pending {
            if let Some(confirmed) = orders::update_status_checked(
                &order.order_id,
                OrderStatusType::Pending,
                OrderStatusType::Confirmed,
                &mut *conn,
            )
            .await?
            {
                orders::append_status_log(
                    &order.order_id,
                    OrderStatusType::Confirmed,
                    ActorRole::System,
                    Some("Payment confirmed by gateway"),
                    conn,
                )
                .await?;
                updated = confirmed;
            }
        }
        Ok(updated)
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, request: NewOrderRequest) -> Result<FullOrder, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order_id = new_order_id();
        let full_order = orders::insert_order(request, &order_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {order_id} has been saved with total {}", full_order.order.total);
        Ok(full_order)
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_full_order(&self, order_id: &OrderId) -> Result<Option<FullOrder>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let Some(order) = orders::fetch_order_by_order_id(order_id, &mut conn).await? else {
            return Ok(None);
        };
        let lines = orders::fetch_lines_for_order(order_id, &mut conn).await?;
        Ok(Some(FullOrder { order, lines }))
    }

    async fn fetch_order_history(&self, order_id: &OrderId) -> Result<Vec<OrderStatusEntry>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let entries = orders::fetch_status_log(order_id, &mut conn).await?;
        Ok(entries)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }

    async fn transition_order(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
        actor: ActorRole,
        note: Option<String>,
    ) -> Result<Order, MarketplaceError> {
        if new_status == OrderStatusType::Cancelled {
            return Err(MarketplaceError::CancellationRequiresReason);
        }
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.clone()))?;
        if !order.status.can_transition_to(new_status) {
            info!("🗃️ Rejecting {} -> {new_status} for order {order_id}", order.status);
            return Err(MarketplaceError::IllegalTransition { from: order.status, to: new_status });
        }
        let mut updated = orders::update_status_checked(order_id, order.status, new_status, &mut tx)
            .await?
            .ok_or(MarketplaceError::IllegalTransition { from: order.status, to: new_status })?;
        if new_status == OrderStatusType::Delivered {
            updated = orders::stamp_delivered(order_id, &mut tx)
                .await?
                .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.clone()))?;
            if updated.payment_method.is_collect_on_delivery()
                && updated.payment_status != PaymentStatusType::Completed
            {
                updated = orders::set_payment_status(order_id, PaymentStatusType::Completed, &mut tx)
                    .await?
                    .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.clone()))?;
                debug!("🗃️ Order {order_id} delivered; collect-on-delivery payment marked completed");
            }
        }
        orders::append_status_log(order_id, new_status, actor, note.as_deref(), &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {order_id} moved from {} to {new_status} by {actor}", order.status);
        Ok(updated)
    }

    async fn cancel_order(
        &self,
        order_id: &OrderId,
        reason: &str,
        actor: ActorRole,
    ) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.clone()))?;
        if !order.status.can_transition_to(OrderStatusType::Cancelled) {
            info!("🗃️ Rejecting cancellation of order {order_id} in status {}", order.status);
            return Err(MarketplaceError::IllegalTransition {
                from: order.status,
                to: OrderStatusType::Cancelled,
            });
        }
        let mut updated = orders::cancel_checked(order_id, order.status, reason, actor, &mut tx)
            .await?
            .ok_or(MarketplaceError::IllegalTransition { from: order.status, to: OrderStatusType::Cancelled })?;
        let lines = orders::fetch_lines_for_order(order_id, &mut tx).await?;
        for line in &lines {
            items::release(&line.item_id, line.quantity, &mut tx).await?;
        }
        if updated.payment_status == PaymentStatusType::Completed {
            updated = orders::set_payment_status(order_id, PaymentStatusType::Refunded, &mut tx)
                .await?
                .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.clone()))?;
            if let Some(reference) = updated.gateway_reference.as_deref() {
                payments::set_status(reference, PaymentStatusType::Refunded, &mut tx).await?;
            }
            info!("🗃️ Order {order_id} was already paid. Payment marked as refunded.");
        }
        orders::append_status_log(order_id, OrderStatusType::Cancelled, actor, Some(reason), &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {order_id} cancelled by {actor} ({} lines released): {reason}", lines.len());
        Ok(updated)
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order_id = payment.order_id.clone();
        let payment = payments::insert_payment(payment, &mut tx).await?;
        if let Some(order_id) = order_id {
            orders::set_gateway_reference(&order_id, &payment.gateway_reference, &mut tx)
                .await?
                .ok_or(MarketplaceError::OrderNotFound(order_id))?;
        }
        tx.commit().await?;
        debug!("🗃️ Payment [{}] recorded for {}", payment.gateway_reference, payment.amount);
        Ok(payment)
    }

    async fn fetch_payment(&self, gateway_reference: &str) -> Result<Option<Payment>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment(gateway_reference, &mut conn).await?;
        Ok(payment)
    }

    async fn settle_payment(
        &self,
        gateway_reference: &str,
        outcome: SettlementOutcome,
        amount: Money,
    ) -> Result<ReconciliationOutcome, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let Some(payment) = payments::fetch_payment(gateway_reference, &mut tx).await? else {
            info!("🗃️ Settlement callback for unknown reference [{gateway_reference}]. Discarding.");
            return Ok(ReconciliationOutcome::Unmatched);
        };
        if payment.status.is_terminal() {
            debug!(
                "🗃️ Payment [{gateway_reference}] already has terminal status {}. Duplicate callback ignored.",
                payment.status
            );
            return Ok(ReconciliationOutcome::Duplicate);
        }
        let order = match payment.order_id.as_ref() {
            Some(order_id) => orders::fetch_order_by_order_id(order_id, &mut tx).await?,
            None => None,
        };
        if outcome == SettlementOutcome::Success {
            let expected = order.as_ref().map(|o| o.total).unwrap_or(payment.amount);
            if amount != expected {
                error!(
                    "🗃️ Settlement for [{gateway_reference}] reports {amount} but {expected} was expected. \
                     Leaving the payment unsettled."
                );
                return Err(MarketplaceError::AmountMismatch { expected, reported: amount });
            }
        }
        let target = match outcome {
            SettlementOutcome::Success => PaymentStatusType::Completed,
            SettlementOutcome::Failed => PaymentStatusType::Failed,
        };
        let Some(settled) = payments::settle_checked(gateway_reference, target, &mut tx).await? else {
            // A concurrent callback won the conditional update.
            debug!("🗃️ Payment [{gateway_reference}] was settled concurrently. Duplicate callback ignored.");
            return Ok(ReconciliationOutcome::Duplicate);
        };
        let updated_order = match (&order, outcome) {
            (Some(order), SettlementOutcome::Success) => {
                Some(Self::apply_successful_settlement(order, &mut tx).await?)
            },
            (Some(order), SettlementOutcome::Failed) => {
                orders::set_payment_status(&order.order_id, PaymentStatusType::Failed, &mut tx).await?
            },
            (None, _) => None,
        };
        tx.commit().await?;
        debug!("🗃️ Payment [{gateway_reference}] is now {}.", settled.status);
        Ok(ReconciliationOutcome::Applied { payment: settled, order: updated_order })
    }

    async fn fetch_stranded_payments(&self) -> Result<Vec<Payment>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let stranded = payments::fetch_stranded(&mut conn).await?;
        Ok(stranded)
    }

    async fn repair_stranded_order(&self, payment: &Payment) -> Result<Option<Order>, MarketplaceError> {
        let Some(order_id) = payment.order_id.as_ref() else {
            return Ok(None);
        };
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::fetch_order_by_order_id(order_id, &mut tx).await? else {
            warn!("🗃️ Stranded payment [{}] points at missing order {order_id}", payment.gateway_reference);
            return Ok(None);
        };
        if order.payment_status == PaymentStatusType::Completed {
            return Ok(Some(order));
        }
        let repaired = Self::apply_successful_settlement(&order, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Re-drove settlement for order {order_id} from payment [{}]", payment.gateway_reference);
        Ok(Some(repaired))
    }

    async fn insert_delivery(&self, delivery: NewDelivery) -> Result<Delivery, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(&delivery.order_id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(delivery.order_id.clone()))?;
        if order.status != OrderStatusType::Ready {
            return Err(MarketplaceError::OrderNotReady { order_id: order.order_id, status: order.status });
        }
        let delivery_id = new_delivery_id();
        let delivery = deliveries::insert_delivery(delivery, &delivery_id, &mut tx).await?;
        deliveries::append_tracking_event(&delivery_id, "Delivery created", None, None, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Delivery {delivery_id} created for order {}", delivery.order_id);
        Ok(delivery)
    }

    async fn fetch_delivery(&self, delivery_id: &DeliveryId) -> Result<Option<Delivery>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let delivery = deliveries::fetch_delivery(delivery_id, &mut conn).await?;
        Ok(delivery)
    }

    async fn transition_delivery(
        &self,
        delivery_id: &DeliveryId,
        new_status: DeliveryStatusType,
        location: Option<String>,
        notes: Option<String>,
    ) -> Result<Delivery, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let delivery = deliveries::fetch_delivery(delivery_id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::DeliveryNotFound(delivery_id.clone()))?;
        if !delivery.status.can_transition_to(new_status) {
            info!("🗃️ Rejecting {} -> {new_status} for delivery {delivery_id}", delivery.status);
            return Err(MarketplaceError::IllegalDeliveryTransition { from: delivery.status, to: new_status });
        }
        let mut updated = deliveries::update_status_checked(delivery_id, delivery.status, new_status, &mut tx)
            .await?
            .ok_or(MarketplaceError::IllegalDeliveryTransition { from: delivery.status, to: new_status })?;
        let event = format!("Status changed to {new_status}");
        deliveries::append_tracking_event(delivery_id, &event, location.as_deref(), notes.as_deref(), &mut tx)
            .await?;
        if new_status == DeliveryStatusType::Delivered {
            updated = deliveries::stamp_actual_delivery(delivery_id, &mut tx)
                .await?
                .ok_or_else(|| MarketplaceError::DeliveryNotFound(delivery_id.clone()))?;
            let order = orders::fetch_order_by_order_id(&updated.order_id, &mut tx)
                .await?
                .ok_or_else(|| MarketplaceError::OrderNotFound(updated.order_id.clone()))?;
            // Only cash/mobile-money changes hands at the door. A gateway payment settles through
            // reconciliation or not at all.
            if order.payment_method.is_collect_on_delivery()
                && order.payment_status != PaymentStatusType::Completed
            {
                orders::set_payment_status(&order.order_id, PaymentStatusType::Completed, &mut tx)
                    .await?
                    .ok_or_else(|| MarketplaceError::OrderNotFound(order.order_id.clone()))?;
                if let Some(reference) = order.gateway_reference.as_deref() {
                    payments::settle_checked(reference, PaymentStatusType::Completed, &mut tx).await?;
                }
                debug!("🗃️ Delivery {delivery_id} completed; payment collected on delivery for order {}", order.order_id);
            }
        }
        tx.commit().await?;
        debug!("🗃️ Delivery {delivery_id} moved from {} to {new_status}", delivery.status);
        Ok(updated)
    }

    async fn fetch_tracking_events(&self, delivery_id: &DeliveryId) -> Result<Vec<TrackingEvent>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let events = deliveries::fetch_tracking_events(delivery_id, &mut conn).await?;
        Ok(events)
    }

    async fn record_telemetry(
        &self,
        delivery_id: &DeliveryId,
        sample: NewTelemetry,
    ) -> Result<Option<ColdChainAlert>, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let delivery = deliveries::fetch_delivery(delivery_id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::DeliveryNotFound(delivery_id.clone()))?;
        let alert = deliveries::record_telemetry(&delivery, sample, &mut tx).await?;
        tx.commit().await?;
        Ok(alert)
    }

    async fn close(&mut self) -> Result<(), MarketplaceError> {
        self.pool.close().await;
        Ok(())
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn insert_item(&self, item: NewItem) -> Result<Item, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let item = items::insert_item(item, &mut conn).await?;
        Ok(item)
    }

    async fn fetch_item(&self, item_id: &ItemId) -> Result<Option<Item>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let item = items::fetch_item(item_id, &mut conn).await?;
        Ok(item)
    }
}
