use std::fmt::Debug;

use log::*;
use smp_common::Money;

use crate::{
    db_types::{
        ActorRole,
        FullOrder,
        NewOrderRequest,
        NewPayment,
        Order,
        OrderId,
        OrderStatusEntry,
        OrderStatusType,
        Payment,
        PaymentStatusType,
        SettlementOutcome,
    },
    events::{EventProducers, OrderAnnulledEvent, OrderPaidEvent, OrderPlacedEvent},
    helpers::new_gateway_reference,
    order_objects::OrderQueryFilter,
    traits::{CheckoutSession, MarketplaceDatabase, MarketplaceError, PaymentGatewayClient, ReconciliationOutcome},
};

/// `OrderFlowApi` is the primary API for the order lifecycle: placement, status transitions, cancellation, and
/// reconciliation of payment gateway callbacks.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: MarketplaceDatabase
{
    /// Places a new order: validates the cart, reserves stock for every line and persists the order atomically.
    ///
    /// Either the whole cart is reserved and the order created in `Pending`, or nothing is written and the error
    /// names the offending line.
    pub async fn place_order(&self, request: NewOrderRequest) -> Result<FullOrder, MarketplaceError> {
        if request.lines.is_empty() {
            return Err(MarketplaceError::EmptyCart);
        }
        if let Some(line) = request.lines.iter().find(|line| line.quantity < 1) {
            return Err(MarketplaceError::InvalidQuantity {
                item_id: line.item_id.clone(),
                quantity: line.quantity,
            });
        }
        let order = self.db.insert_order(request).await?;
        self.call_order_placed_hook(&order).await;
        debug!("📦️ Order {} placed with {} lines, total {}", order.order.order_id, order.lines.len(), order.order.total);
        Ok(order)
    }

    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, MarketplaceError> {
        self.db.fetch_order(order_id).await
    }

    pub async fn fetch_full_order(&self, order_id: &OrderId) -> Result<Option<FullOrder>, MarketplaceError> {
        self.db.fetch_full_order(order_id).await
    }

    pub async fn order_history(&self, order_id: &OrderId) -> Result<Vec<OrderStatusEntry>, MarketplaceError> {
        self.db.fetch_order_history(order_id).await
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, MarketplaceError> {
        self.db.search_orders(query).await
    }

    /// Moves the order along the legal status graph, recording who asked and why in the audit log.
    ///
    /// A transition to `Cancelled` is routed through [`Self::cancel_order`], with the note as the mandatory
    /// reason, so that reserved stock is always released.
    pub async fn transition_order_status(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
        actor: ActorRole,
        note: Option<String>,
    ) -> Result<Order, MarketplaceError> {
        if new_status == OrderStatusType::Cancelled {
            let reason = note.ok_or(MarketplaceError::CancellationRequiresReason)?;
            return self.cancel_order(order_id, &reason, actor).await;
        }
        let order = self.db.transition_order(order_id, new_status, actor, note).await?;
        // A prepaid order already raised its paid event at reconciliation; only a payment collected at
        // the door settles here.
        if new_status == OrderStatusType::Delivered
            && order.payment_method.is_collect_on_delivery()
            && order.payment_status == PaymentStatusType::Completed
        {
            self.call_order_paid_hook(&order).await;
        }
        Ok(order)
    }

    /// Cancels the order and releases its reserved stock. Illegal once the order has shipped.
    pub async fn cancel_order(
        &self,
        order_id: &OrderId,
        reason: &str,
        actor: ActorRole,
    ) -> Result<Order, MarketplaceError> {
        let order = self.db.cancel_order(order_id, reason, actor).await?;
        self.call_order_annulled_hook(&order).await;
        info!("📦️ Order {order_id} cancelled by {actor}: {reason}");
        Ok(order)
    }

    /// Opens a checkout session at the gateway for the order's total and records the pending payment under a
    /// freshly minted reference. The order's payment status moves to `Processing`.
    pub async fn checkout<G: PaymentGatewayClient>(
        &self,
        order_id: &OrderId,
        gateway: &G,
    ) -> Result<CheckoutSession, MarketplaceError> {
        let order = self
            .db
            .fetch_order(order_id)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.clone()))?;
        let reference = new_gateway_reference();
        let session = gateway
            .initialize(order.total, &order.currency, &reference)
            .await
            .map_err(|e| MarketplaceError::GatewayError(e.to_string()))?;
        let payment = NewPayment::new(&session.reference, order.total).for_order(order_id.clone());
        self.db.insert_payment(payment).await?;
        debug!("💳️ Checkout session [{}] opened for order {order_id} ({})", session.reference, order.total);
        Ok(session)
    }

    /// Applies a settlement callback from the gateway. Idempotent: duplicate callbacks and callbacks for unknown
    /// references are swallowed (and logged), never errors.
    pub async fn reconcile_payment(
        &self,
        gateway_reference: &str,
        outcome: SettlementOutcome,
        amount: Money,
    ) -> Result<ReconciliationOutcome, MarketplaceError> {
        let result = self.db.settle_payment(gateway_reference, outcome, amount).await?;
        if let ReconciliationOutcome::Applied { order: Some(order), .. } = &result {
            if order.payment_status == PaymentStatusType::Completed {
                self.call_order_paid_hook(order).await;
            }
        }
        Ok(result)
    }

    /// Polls the gateway for the status of a reference and applies the answer as if it were a callback. Used when
    /// a callback is suspected lost.
    pub async fn poll_payment<G: PaymentGatewayClient>(
        &self,
        gateway_reference: &str,
        gateway: &G,
    ) -> Result<ReconciliationOutcome, MarketplaceError> {
        let verification =
            gateway.verify(gateway_reference).await.map_err(|e| MarketplaceError::GatewayError(e.to_string()))?;
        self.reconcile_payment(gateway_reference, verification.status, verification.amount).await
    }

    /// The reconciliation sweep: finds settled payments whose order never recorded the settlement (a crash
    /// between the two writes) and re-drives the order-side effects. Returns the repaired orders.
    pub async fn reconcile_stranded_orders(&self) -> Result<Vec<Order>, MarketplaceError> {
        let stranded = self.db.fetch_stranded_payments().await?;
        let mut repaired = Vec::with_capacity(stranded.len());
        for payment in &stranded {
            if let Some(order) = self.db.repair_stranded_order(payment).await? {
                self.call_order_paid_hook(&order).await;
                repaired.push(order);
            }
        }
        if !repaired.is_empty() {
            info!("💳️ Reconciliation sweep repaired {} stranded order(s)", repaired.len());
        }
        Ok(repaired)
    }

    pub async fn fetch_payment(&self, gateway_reference: &str) -> Result<Option<Payment>, MarketplaceError> {
        self.db.fetch_payment(gateway_reference).await
    }

    async fn call_order_placed_hook(&self, order: &FullOrder) {
        for emitter in &self.producers.order_placed_producer {
            debug!("📦️ Notifying order placed hook subscribers");
            let event = OrderPlacedEvent::new(order.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            debug!("💳️ Notifying order paid hook subscribers");
            let event = OrderPaidEvent::new(order.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_order_annulled_hook(&self, order: &Order) {
        for emitter in &self.producers.order_annulled_producer {
            debug!("📦️ Notifying order annulled hook subscribers");
            let event = OrderAnnulledEvent::new(order.clone());
            emitter.publish_event(event).await;
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use smp_common::Money;

    use super::*;
    use crate::{
        db_types::{CartLine, ItemId, NewItem, PaymentMethod},
        events::{EventHandlers, EventHooks},
        test_utils::{
            mock_gateway::MemoryGateway,
            prepare_env::{prepare_test_env, random_db_path},
        },
        traits::CatalogManagement,
        SqliteDatabase,
    };

    async fn test_setup() -> (SqliteDatabase, OrderFlowApi<SqliteDatabase>) {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating test database");
        let api = OrderFlowApi::new(db.clone(), EventProducers::default());
        (db, api)
    }

    /// Seeds two farmer-1 listings and one farmer-2 listing.
    async fn seed_catalogue(db: &SqliteDatabase) {
        db.insert_item(NewItem::new(ItemId::from("item-maize"), "farmer-1", "Maize, dry grade 1", Money::from_shillings(50), 10))
            .await
            .unwrap();
        db.insert_item(NewItem::new(ItemId::from("item-beans"), "farmer-1", "Beans, rosecoco", Money::from_shillings(120), 5))
            .await
            .unwrap();
        db.insert_item(NewItem::new(ItemId::from("item-kale"), "farmer-2", "Kale, bunch", Money::from_shillings(30), 20))
            .await
            .unwrap();
    }

    fn maize_and_beans() -> NewOrderRequest {
        let lines = vec![CartLine::new("item-maize", 4), CartLine::new("item-beans", 2)];
        NewOrderRequest::new("buyer-amina", lines)
            .with_delivery_fee(Money::from_shillings(100))
            .with_discount(Money::from_shillings(20))
    }

    #[tokio::test]
    async fn placement_snapshots_lines_and_totals() {
        let (db, api) = test_setup().await;
        seed_catalogue(&db).await;
        let order = api.place_order(maize_and_beans()).await.unwrap();
        assert_eq!(order.order.status, OrderStatusType::Pending);
        assert_eq!(order.order.payment_status, PaymentStatusType::Pending);
        assert_eq!(order.order.seller_id, "farmer-1");
        // 4 x 50 + 2 x 120 = 440; + 100 delivery - 20 discount = 520
        assert_eq!(order.order.subtotal, Money::from_shillings(440));
        assert_eq!(order.order.total, Money::from_shillings(520));
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.lines[0].unit_price, Money::from_shillings(50));
        assert_eq!(order.lines[0].line_total, Money::from_shillings(200));
        let maize = db.fetch_item(&ItemId::from("item-maize")).await.unwrap().unwrap();
        assert_eq!(maize.quantity, 6);
        let beans = db.fetch_item(&ItemId::from("item-beans")).await.unwrap().unwrap();
        assert_eq!(beans.quantity, 3);
        let history = api.order_history(&order.order.order_id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, OrderStatusType::Pending);
        assert_eq!(history[0].actor, ActorRole::Buyer);
    }

    #[tokio::test]
    async fn empty_carts_and_bad_quantities_are_rejected() {
        let (db, api) = test_setup().await;
        seed_catalogue(&db).await;
        let err = api.place_order(NewOrderRequest::new("buyer-amina", vec![])).await.unwrap_err();
        assert!(matches!(err, MarketplaceError::EmptyCart));
        let cart = vec![CartLine::new("item-maize", 0)];
        let err = api.place_order(NewOrderRequest::new("buyer-amina", cart)).await.unwrap_err();
        assert!(matches!(err, MarketplaceError::InvalidQuantity { quantity: 0, .. }));
        let cart = vec![CartLine::new("item-maize", -3)];
        let err = api.place_order(NewOrderRequest::new("buyer-amina", cart)).await.unwrap_err();
        assert!(matches!(err, MarketplaceError::InvalidQuantity { quantity: -3, .. }));
    }

    #[tokio::test]
    async fn a_failing_line_rolls_back_every_reservation() {
        let (db, api) = test_setup().await;
        seed_catalogue(&db).await;
        // Maize reserves fine; beans only has 5 in stock.
        let cart = vec![CartLine::new("item-maize", 4), CartLine::new("item-beans", 9)];
        let err = api.place_order(NewOrderRequest::new("buyer-amina", cart)).await.unwrap_err();
        assert!(matches!(err, MarketplaceError::InsufficientStock { requested: 9, available: 5, .. }));
        let maize = db.fetch_item(&ItemId::from("item-maize")).await.unwrap().unwrap();
        assert_eq!(maize.quantity, 10, "rolled-back reservation must restore stock");
        assert!(api.search_orders(OrderQueryFilter::default().with_buyer_id("buyer-amina")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn carts_spanning_sellers_are_rejected() {
        let (db, api) = test_setup().await;
        seed_catalogue(&db).await;
        let cart = vec![CartLine::new("item-maize", 2), CartLine::new("item-kale", 1)];
        let err = api.place_order(NewOrderRequest::new("buyer-amina", cart)).await.unwrap_err();
        assert!(matches!(err, MarketplaceError::MixedSellerCart { .. }));
        let maize = db.fetch_item(&ItemId::from("item-maize")).await.unwrap().unwrap();
        assert_eq!(maize.quantity, 10);
    }

    #[tokio::test]
    async fn concurrent_placements_never_oversell() {
        let (db, api_a) = test_setup().await;
        seed_catalogue(&db).await;
        let api_b = OrderFlowApi::new(db.clone(), EventProducers::default());
        // 10 units of maize; two buyers race for 6 each. Exactly one can win.
        let cart_a = NewOrderRequest::new("buyer-amina", vec![CartLine::new("item-maize", 6)]);
        let cart_b = NewOrderRequest::new("buyer-baraka", vec![CartLine::new("item-maize", 6)]);
        let (res_a, res_b) = tokio::join!(api_a.place_order(cart_a), api_b.place_order(cart_b));
        assert_ne!(res_a.is_ok(), res_b.is_ok(), "exactly one of the racing orders must win");
        let loser = if res_a.is_ok() { res_b } else { res_a };
        assert!(matches!(loser.unwrap_err(), MarketplaceError::InsufficientStock { requested: 6, available: 4, .. }));
        let maize = db.fetch_item(&ItemId::from("item-maize")).await.unwrap().unwrap();
        assert_eq!(maize.quantity, 4);
    }

    #[tokio::test]
    async fn the_transition_graph_is_enforced() {
        let (db, api) = test_setup().await;
        seed_catalogue(&db).await;
        let request = maize_and_beans().with_payment_method(PaymentMethod::CashOnDelivery);
        let order = api.place_order(request).await.unwrap();
        let oid = order.order.order_id.clone();

        let err = api.transition_order_status(&oid, OrderStatusType::Delivered, ActorRole::Courier, None).await;
        assert!(matches!(
            err.unwrap_err(),
            MarketplaceError::IllegalTransition { from: OrderStatusType::Pending, to: OrderStatusType::Delivered }
        ));
        let err = api.transition_order_status(&oid, OrderStatusType::Cancelled, ActorRole::Buyer, None).await;
        assert!(matches!(err.unwrap_err(), MarketplaceError::CancellationRequiresReason));

        for status in [
            OrderStatusType::Confirmed,
            OrderStatusType::Preparing,
            OrderStatusType::Ready,
            OrderStatusType::Shipped,
        ] {
            api.transition_order_status(&oid, status, ActorRole::Seller, None).await.unwrap();
        }
        let err = api.cancel_order(&oid, "changed my mind", ActorRole::Buyer).await;
        assert!(matches!(
            err.unwrap_err(),
            MarketplaceError::IllegalTransition { from: OrderStatusType::Shipped, to: OrderStatusType::Cancelled }
        ));

        let order = api.transition_order_status(&oid, OrderStatusType::Delivered, ActorRole::Courier, None).await.unwrap();
        assert_eq!(order.status, OrderStatusType::Delivered);
        assert!(order.delivered_at.is_some());
        // Cash on delivery: reaching Delivered settles the payment.
        assert_eq!(order.payment_status, PaymentStatusType::Completed);
        let history = api.order_history(&oid).await.unwrap();
        assert_eq!(history.len(), 6);
        assert_eq!(history.last().unwrap().status, OrderStatusType::Delivered);
    }

    #[tokio::test]
    async fn cancellation_releases_stock_and_records_metadata() {
        let (db, api) = test_setup().await;
        seed_catalogue(&db).await;
        let order = api.place_order(maize_and_beans()).await.unwrap();
        let oid = order.order.order_id.clone();
        let cancelled = api.cancel_order(&oid, "Buyer found a better price", ActorRole::Buyer).await.unwrap();
        assert_eq!(cancelled.status, OrderStatusType::Cancelled);
        assert_eq!(cancelled.cancelled_reason.as_deref(), Some("Buyer found a better price"));
        assert_eq!(cancelled.cancelled_by, Some(ActorRole::Buyer));
        assert!(cancelled.cancelled_at.is_some());
        let maize = db.fetch_item(&ItemId::from("item-maize")).await.unwrap().unwrap();
        assert_eq!(maize.quantity, 10);
        let beans = db.fetch_item(&ItemId::from("item-beans")).await.unwrap().unwrap();
        assert_eq!(beans.quantity, 5);
        let history = api.order_history(&oid).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.last().unwrap().status, OrderStatusType::Cancelled);
    }

    #[tokio::test]
    async fn cancelling_a_paid_order_flags_the_refund() {
        let (db, api) = test_setup().await;
        seed_catalogue(&db).await;
        let gateway = MemoryGateway::new();
        let order = api.place_order(maize_and_beans()).await.unwrap();
        let oid = order.order.order_id.clone();
        let session = api.checkout(&oid, &gateway).await.unwrap();
        api.reconcile_payment(&session.reference, SettlementOutcome::Success, order.order.total).await.unwrap();
        let cancelled = api.cancel_order(&oid, "Crop failed before dispatch", ActorRole::Seller).await.unwrap();
        assert_eq!(cancelled.payment_status, PaymentStatusType::Refunded);
        let payment = api.fetch_payment(&session.reference).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatusType::Refunded);
    }

    #[tokio::test]
    async fn checkout_and_successful_settlement_confirm_the_order() {
        let (db, api) = test_setup().await;
        seed_catalogue(&db).await;
        let gateway = MemoryGateway::new();
        let order = api.place_order(maize_and_beans()).await.unwrap();
        let oid = order.order.order_id.clone();
        let session = api.checkout(&oid, &gateway).await.unwrap();
        assert!(session.reference.starts_with("PAY-"));
        let pending = api.fetch_order(&oid).await.unwrap().unwrap();
        assert_eq!(pending.payment_status, PaymentStatusType::Processing);
        assert_eq!(pending.gateway_reference.as_deref(), Some(session.reference.as_str()));

        let result =
            api.reconcile_payment(&session.reference, SettlementOutcome::Success, order.order.total).await.unwrap();
        assert!(result.is_applied());
        let confirmed = api.fetch_order(&oid).await.unwrap().unwrap();
        assert_eq!(confirmed.status, OrderStatusType::Confirmed);
        assert_eq!(confirmed.payment_status, PaymentStatusType::Completed);
        let history = api.order_history(&oid).await.unwrap();
        assert_eq!(history.last().unwrap().actor, ActorRole::System);
    }

    #[tokio::test]
    async fn duplicate_and_unknown_callbacks_are_swallowed() {
        let (db, api) = test_setup().await;
        seed_catalogue(&db).await;
        let gateway = MemoryGateway::new();
        let order = api.place_order(maize_and_beans()).await.unwrap();
        let oid = order.order.order_id.clone();
        let session = api.checkout(&oid, &gateway).await.unwrap();
        let total = order.order.total;
        api.reconcile_payment(&session.reference, SettlementOutcome::Success, total).await.unwrap();
        let history_len = api.order_history(&oid).await.unwrap().len();

        let result = api.reconcile_payment(&session.reference, SettlementOutcome::Success, total).await.unwrap();
        assert!(matches!(result, ReconciliationOutcome::Duplicate));
        // A replayed callback must not grow the audit log or change the order.
        assert_eq!(api.order_history(&oid).await.unwrap().len(), history_len);
        assert_eq!(api.fetch_order(&oid).await.unwrap().unwrap().status, OrderStatusType::Confirmed);

        let result = api.reconcile_payment("PAY-NOSUCHREF", SettlementOutcome::Success, total).await.unwrap();
        assert!(matches!(result, ReconciliationOutcome::Unmatched));
    }

    #[tokio::test]
    async fn amount_mismatches_leave_the_payment_unsettled() {
        let (db, api) = test_setup().await;
        seed_catalogue(&db).await;
        let gateway = MemoryGateway::new();
        let order = api.place_order(maize_and_beans()).await.unwrap();
        let oid = order.order.order_id.clone();
        let session = api.checkout(&oid, &gateway).await.unwrap();
        let err = api
            .reconcile_payment(&session.reference, SettlementOutcome::Success, Money::from_shillings(1))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketplaceError::AmountMismatch { .. }));
        let payment = api.fetch_payment(&session.reference).await.unwrap().unwrap();
        assert!(!payment.status.is_terminal());
        // The corrected callback can still settle.
        let result =
            api.reconcile_payment(&session.reference, SettlementOutcome::Success, order.order.total).await.unwrap();
        assert!(result.is_applied());
    }

    #[tokio::test]
    async fn failed_settlements_mark_the_payment_failed() {
        let (db, api) = test_setup().await;
        seed_catalogue(&db).await;
        let gateway = MemoryGateway::new();
        let order = api.place_order(maize_and_beans()).await.unwrap();
        let oid = order.order.order_id.clone();
        let session = api.checkout(&oid, &gateway).await.unwrap();
        gateway.set_outcome(&session.reference, SettlementOutcome::Failed);
        let result = api.poll_payment(&session.reference, &gateway).await.unwrap();
        assert!(result.is_applied());
        let payment = api.fetch_payment(&session.reference).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatusType::Failed);
        let order = api.fetch_order(&oid).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatusType::Failed);
        assert_eq!(order.status, OrderStatusType::Pending, "a failed payment does not confirm the order");
    }

    #[tokio::test]
    async fn the_sweep_repairs_stranded_orders() {
        let (db, api) = test_setup().await;
        seed_catalogue(&db).await;
        let gateway = MemoryGateway::new();
        let order = api.place_order(maize_and_beans()).await.unwrap();
        let oid = order.order.order_id.clone();
        let session = api.checkout(&oid, &gateway).await.unwrap();
        // Simulate a crash between the payment write and the order write.
        sqlx::query("UPDATE payments SET status = 'Completed' WHERE gateway_reference = $1")
            .bind(&session.reference)
            .execute(db.pool())
            .await
            .unwrap();
        let repaired = api.reconcile_stranded_orders().await.unwrap();
        assert_eq!(repaired.len(), 1);
        assert_eq!(repaired[0].order_id, oid);
        assert_eq!(repaired[0].status, OrderStatusType::Confirmed);
        assert_eq!(repaired[0].payment_status, PaymentStatusType::Completed);
        // The sweep is idempotent.
        assert!(api.reconcile_stranded_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_filters_by_buyer_and_status() {
        let (db, api) = test_setup().await;
        seed_catalogue(&db).await;
        let first = api.place_order(NewOrderRequest::new("buyer-amina", vec![CartLine::new("item-maize", 1)])).await.unwrap();
        let second = api.place_order(NewOrderRequest::new("buyer-baraka", vec![CartLine::new("item-kale", 2)])).await.unwrap();
        api.cancel_order(&second.order.order_id, "test", ActorRole::Buyer).await.unwrap();
        let amina = api.search_orders(OrderQueryFilter::default().with_buyer_id("buyer-amina")).await.unwrap();
        assert_eq!(amina.len(), 1);
        assert_eq!(amina[0].order_id, first.order.order_id);
        let cancelled =
            api.search_orders(OrderQueryFilter::default().with_status(OrderStatusType::Cancelled)).await.unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].order_id, second.order.order_id);
    }

    #[tokio::test]
    async fn placing_an_order_notifies_subscribers() {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating test database");
        seed_catalogue(&db).await;
        let (tx, mut rx) = tokio::sync::mpsc::channel(5);
        let mut hooks = EventHooks::default();
        hooks.on_order_placed(move |event| {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(event.order.order.order_id.clone()).await;
            })
        });
        let handlers = EventHandlers::new(5, hooks);
        let producers = handlers.producers();
        handlers.start_handlers().await;
        let api = OrderFlowApi::new(db, producers);
        let order = api.place_order(maize_and_beans()).await.unwrap();
        let notified = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for the order placed event")
            .expect("event channel closed");
        assert_eq!(notified, order.order.order_id);
    }

    #[tokio::test]
    async fn delivering_a_prepaid_order_does_not_renotify_payment() {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating test database");
        seed_catalogue(&db).await;
        let (tx, mut rx) = tokio::sync::mpsc::channel(5);
        let mut hooks = EventHooks::default();
        hooks.on_order_paid(move |event| {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(event.order.order_id.clone()).await;
            })
        });
        let handlers = EventHandlers::new(5, hooks);
        let producers = handlers.producers();
        handlers.start_handlers().await;
        let api = OrderFlowApi::new(db, producers);
        let gateway = MemoryGateway::new();
        let order = api.place_order(maize_and_beans()).await.unwrap();
        let oid = order.order.order_id.clone();
        let session = api.checkout(&oid, &gateway).await.unwrap();
        api.reconcile_payment(&session.reference, SettlementOutcome::Success, order.order.total).await.unwrap();
        let paid = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for the order paid event")
            .expect("event channel closed");
        assert_eq!(paid, oid);
        for status in [
            OrderStatusType::Preparing,
            OrderStatusType::Ready,
            OrderStatusType::Shipped,
            OrderStatusType::Delivered,
        ] {
            api.transition_order_status(&oid, status, ActorRole::Seller, None).await.unwrap();
        }
        let extra = tokio::time::timeout(Duration::from_millis(250), rx.recv()).await;
        assert!(extra.is_err(), "an order settled at reconciliation must notify payment exactly once");
    }
}
