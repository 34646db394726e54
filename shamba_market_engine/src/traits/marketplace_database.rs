use smp_common::Money;
use thiserror::Error;

use crate::{
    db_types::{
        ActorRole,
        ColdChainAlert,
        Delivery,
        DeliveryId,
        DeliveryStatusType,
        FullOrder,
        ItemId,
        ItemStatus,
        NewDelivery,
        NewOrderRequest,
        NewPayment,
        NewTelemetry,
        Order,
        OrderId,
        OrderStatusEntry,
        OrderStatusType,
        Payment,
        SettlementOutcome,
        TrackingEvent,
    },
    order_objects::OrderQueryFilter,
    traits::ReconciliationOutcome,
};

/// The error taxonomy for the order lifecycle core.
///
/// Validation failures and conflicts identify the offending line or state pair, so clients can show the buyer
/// exactly what to fix (reduce a quantity, drop a line, refresh a stale status).
#[derive(Debug, Clone, Error)]
pub enum MarketplaceError {
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Quantity {quantity} for item {item_id} is not a positive amount")]
    InvalidQuantity { item_id: ItemId, quantity: i64 },
    #[error("A single order cannot span multiple sellers. Item {item_id} belongs to a different seller")]
    MixedSellerCart { item_id: ItemId },
    #[error("Item {0} does not exist")]
    ItemNotFound(ItemId),
    #[error("Item {item_id} ({name}) is not available for sale (status: {status})")]
    ItemUnavailable { item_id: ItemId, name: String, status: ItemStatus },
    #[error("Insufficient stock for item {item_id} ({name}): requested {requested}, available {available}")]
    InsufficientStock { item_id: ItemId, name: String, requested: i64, available: i64 },
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} already exists")]
    OrderAlreadyExists(OrderId),
    #[error("Order status cannot change from {from} to {to}")]
    IllegalTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("Cancellation must go through the cancellation flow, which releases reserved stock")]
    CancellationRequiresReason,
    #[error("No payment record matches gateway reference [{0}]")]
    PaymentNotFound(String),
    #[error("A payment record with gateway reference [{0}] already exists")]
    PaymentAlreadyExists(String),
    #[error("Reported amount {reported} does not match the order total {expected}")]
    AmountMismatch { expected: Money, reported: Money },
    #[error("Delivery {0} does not exist")]
    DeliveryNotFound(DeliveryId),
    #[error("Order {0} already has a delivery assigned")]
    DeliveryAlreadyExists(OrderId),
    #[error("Delivery status cannot change from {from} to {to}")]
    IllegalDeliveryTransition { from: DeliveryStatusType, to: DeliveryStatusType },
    #[error("Order {order_id} is not ready for fulfilment (status: {status})")]
    OrderNotReady { order_id: OrderId, status: OrderStatusType },
    #[error("Payment gateway error: {0}")]
    GatewayError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for MarketplaceError {
    fn from(e: sqlx::Error) -> Self {
        MarketplaceError::DatabaseError(e.to_string())
    }
}

/// The highest-level storage contract for the order lifecycle core.
///
/// Implementations must provide:
/// * linearizable inventory reservation — concurrent placements against the same item never jointly overdraw it;
/// * all-or-nothing placement — a failing line rolls back every reservation the attempt already made;
/// * serialized per-order status transitions — two racing transitions resolve as one applied to a consistent
///   prior state, never a lost update;
/// * at-most-once payment settlement keyed on the gateway reference.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase: Clone {
    /// The URL of the underlying database.
    fn url(&self) -> &str;

    /// Validates the cart against live stock, reserves inventory for every line and persists the order snapshot,
    /// all in one atomic transaction. The order is created with status `Pending` and payment status `Pending`.
    ///
    /// If any line cannot be reserved, every reservation made earlier in this attempt is rolled back, no order
    /// row is written, and the returned error names the offending line.
    async fn insert_order(&self, request: NewOrderRequest) -> Result<FullOrder, MarketplaceError>;

    /// Fetches the order row for the given order id, without its lines.
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, MarketplaceError>;

    /// Fetches the order together with its line snapshots.
    async fn fetch_full_order(&self, order_id: &OrderId) -> Result<Option<FullOrder>, MarketplaceError>;

    /// Returns the append-only status audit log for the order, oldest entry first.
    async fn fetch_order_history(&self, order_id: &OrderId) -> Result<Vec<OrderStatusEntry>, MarketplaceError>;

    /// Fetches orders matching the given filter, ordered by creation time.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, MarketplaceError>;

    /// Applies a status transition to the order, enforcing the legal transition graph and appending an audit
    /// entry. Transitions to `Cancelled` are rejected here; use [`Self::cancel_order`], which also releases stock.
    ///
    /// On `Delivered`, the completion timestamp is stamped and, for collect-on-delivery payment methods, the
    /// payment status is marked `Completed`.
    async fn transition_order(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
        actor: ActorRole,
        note: Option<String>,
    ) -> Result<Order, MarketplaceError>;

    /// Cancels the order: checks the transition is legal, releases the reservation for every line, stamps the
    /// cancellation metadata (reason, actor, timestamp) and appends an audit entry, atomically. An order whose
    /// payment had already settled has its payment status moved to `Refunded`.
    async fn cancel_order(&self, order_id: &OrderId, reason: &str, actor: ActorRole)
        -> Result<Order, MarketplaceError>;

    /// Records a payment initialised at the gateway. The gateway reference must be unique; a duplicate reference
    /// returns [`MarketplaceError::PaymentAlreadyExists`]. If the payment is linked to an order, the order's
    /// gateway reference and `Processing` payment status are set in the same transaction.
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, MarketplaceError>;

    /// Fetches a payment record by its unique gateway reference.
    async fn fetch_payment(&self, gateway_reference: &str) -> Result<Option<Payment>, MarketplaceError>;

    /// Applies a gateway settlement callback, idempotently.
    ///
    /// * Unknown reference: nothing is written; returns [`ReconciliationOutcome::Unmatched`].
    /// * Payment already terminal: nothing is written; returns [`ReconciliationOutcome::Duplicate`].
    /// * Otherwise the payment is moved to its terminal status and, on success, the linked order's payment status
    ///   becomes `Completed` and a still-`Pending` order is transitioned to `Confirmed`, all in one transaction.
    ///
    /// A successful settlement whose reported amount differs from the linked order's total fails with
    /// [`MarketplaceError::AmountMismatch`] and leaves the payment pending, so a corrected callback can still land.
    async fn settle_payment(
        &self,
        gateway_reference: &str,
        outcome: SettlementOutcome,
        amount: Money,
    ) -> Result<ReconciliationOutcome, MarketplaceError>;

    /// Finds `Completed` payments whose linked order still shows a non-`Completed` payment status. These are
    /// orders stranded by a crash between the payment write and the order write.
    async fn fetch_stranded_payments(&self) -> Result<Vec<Payment>, MarketplaceError>;

    /// Re-drives the order-side effects of a successful settlement for one stranded payment. Idempotent.
    async fn repair_stranded_order(&self, payment: &Payment) -> Result<Option<Order>, MarketplaceError>;

    /// Creates the delivery record for an order that is ready for fulfilment. One delivery per order.
    async fn insert_delivery(&self, delivery: NewDelivery) -> Result<Delivery, MarketplaceError>;

    async fn fetch_delivery(&self, delivery_id: &DeliveryId) -> Result<Option<Delivery>, MarketplaceError>;

    /// Applies a delivery status transition, appending a tracking event. Reaching `Delivered` stamps
    /// `actual_delivery` and completes the owning order's payment if it has not already settled.
    async fn transition_delivery(
        &self,
        delivery_id: &DeliveryId,
        new_status: DeliveryStatusType,
        location: Option<String>,
        notes: Option<String>,
    ) -> Result<Delivery, MarketplaceError>;

    /// Returns the append-only tracking log for the delivery, oldest event first.
    async fn fetch_tracking_events(&self, delivery_id: &DeliveryId) -> Result<Vec<TrackingEvent>, MarketplaceError>;

    /// Stores a telemetry sample. If the delivery is cold-chain monitored and the sample falls outside the
    /// configured band, an alert row is written and returned. Alerts are informational and never block.
    async fn record_telemetry(
        &self,
        delivery_id: &DeliveryId,
        sample: NewTelemetry,
    ) -> Result<Option<ColdChainAlert>, MarketplaceError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), MarketplaceError> {
        Ok(())
    }
}
