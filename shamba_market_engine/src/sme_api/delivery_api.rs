use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{ColdChainAlert, Delivery, DeliveryId, DeliveryStatusType, NewDelivery, NewTelemetry, TrackingEvent},
    events::{ColdChainAlertEvent, DeliveryUpdatedEvent, EventProducers},
    traits::{MarketplaceDatabase, MarketplaceError},
};

/// `DeliveryApi` is the courier-facing API: delivery creation, tracking updates and cold-chain telemetry.
pub struct DeliveryApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for DeliveryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeliveryApi")
    }
}

impl<B> DeliveryApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> DeliveryApi<B>
where B: MarketplaceDatabase
{
    /// Creates the delivery record for an order that has reached the ready-for-fulfilment state. One delivery
    /// per order.
    pub async fn create_delivery(&self, delivery: NewDelivery) -> Result<Delivery, MarketplaceError> {
        let delivery = self.db.insert_delivery(delivery).await?;
        self.call_delivery_updated_hook(&delivery).await;
        debug!("📬️ Delivery {} created for order {}", delivery.delivery_id, delivery.order_id);
        Ok(delivery)
    }

    pub async fn fetch_delivery(&self, delivery_id: &DeliveryId) -> Result<Option<Delivery>, MarketplaceError> {
        self.db.fetch_delivery(delivery_id).await
    }

    /// Moves the delivery along its status graph and appends a tracking event. Reaching `Delivered` stamps the
    /// actual delivery time and settles any payment still being collected on delivery.
    pub async fn update_delivery_status(
        &self,
        delivery_id: &DeliveryId,
        new_status: DeliveryStatusType,
        location: Option<String>,
        notes: Option<String>,
    ) -> Result<Delivery, MarketplaceError> {
        let delivery = self.db.transition_delivery(delivery_id, new_status, location, notes).await?;
        self.call_delivery_updated_hook(&delivery).await;
        Ok(delivery)
    }

    /// Returns the append-only tracking log, oldest event first.
    pub async fn tracking_log(&self, delivery_id: &DeliveryId) -> Result<Vec<TrackingEvent>, MarketplaceError> {
        self.db.fetch_tracking_events(delivery_id).await
    }

    /// Records one sensor reading against the delivery. Returns the alert if the reading breached the cold-chain
    /// band; readings against unmonitored deliveries are stored but never alert.
    pub async fn record_telemetry(
        &self,
        delivery_id: &DeliveryId,
        sample: NewTelemetry,
    ) -> Result<Option<ColdChainAlert>, MarketplaceError> {
        let alert = self.db.record_telemetry(delivery_id, sample).await?;
        if let Some(alert) = &alert {
            self.call_cold_chain_alert_hook(alert).await;
        }
        Ok(alert)
    }

    async fn call_delivery_updated_hook(&self, delivery: &Delivery) {
        for emitter in &self.producers.delivery_updated_producer {
            debug!("📬️ Notifying delivery updated hook subscribers");
            let event = DeliveryUpdatedEvent::new(delivery.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_cold_chain_alert_hook(&self, alert: &ColdChainAlert) {
        for emitter in &self.producers.cold_chain_alert_producer {
            debug!("🧊️ Notifying cold chain alert hook subscribers");
            let event = ColdChainAlertEvent::new(alert.clone());
            emitter.publish_event(event).await;
        }
    }
}

#[cfg(test)]
mod test {
    use smp_common::Money;

    use super::*;
    use crate::{
        db_types::{
            ActorRole,
            CartLine,
            ItemId,
            NewItem,
            NewOrderRequest,
            OrderId,
            OrderStatusType,
            PaymentMethod,
            PaymentStatusType,
        },
        test_utils::prepare_env::{prepare_test_env, random_db_path},
        traits::CatalogManagement,
        SqliteDatabase,
    };

    async fn test_setup() -> (SqliteDatabase, DeliveryApi<SqliteDatabase>) {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating test database");
        let api = DeliveryApi::new(db.clone(), EventProducers::default());
        (db, api)
    }

    /// Places an order for 3 bunches of kale and returns its id, still `Pending`.
    async fn place_order(db: &SqliteDatabase, method: PaymentMethod) -> OrderId {
        db.insert_item(NewItem::new(ItemId::from("item-kale"), "farmer-2", "Kale, bunch", Money::from_shillings(30), 20))
            .await
            .unwrap();
        let request =
            NewOrderRequest::new("buyer-amina", vec![CartLine::new("item-kale", 3)]).with_payment_method(method);
        let order = db.insert_order(request).await.unwrap();
        order.order.order_id
    }

    async fn make_ready(db: &SqliteDatabase, oid: &OrderId) {
        for status in [OrderStatusType::Confirmed, OrderStatusType::Preparing, OrderStatusType::Ready] {
            db.transition_order(oid, status, ActorRole::Seller, None).await.unwrap();
        }
    }

    #[tokio::test]
    async fn deliveries_require_a_ready_order() {
        let (db, api) = test_setup().await;
        let oid = place_order(&db, PaymentMethod::CashOnDelivery).await;
        let err = api.create_delivery(NewDelivery::new(oid.clone(), "courier-juma")).await.unwrap_err();
        assert!(matches!(err, MarketplaceError::OrderNotReady { status: OrderStatusType::Pending, .. }));
        make_ready(&db, &oid).await;
        api.create_delivery(NewDelivery::new(oid.clone(), "courier-juma")).await.unwrap();
        let err = api.create_delivery(NewDelivery::new(oid.clone(), "courier-wanjiru")).await.unwrap_err();
        assert!(matches!(err, MarketplaceError::DeliveryAlreadyExists(_)));
    }

    #[tokio::test]
    async fn the_delivery_flow_completes_the_order_payment() {
        let (db, api) = test_setup().await;
        let oid = place_order(&db, PaymentMethod::CashOnDelivery).await;
        make_ready(&db, &oid).await;
        let delivery = api.create_delivery(NewDelivery::new(oid.clone(), "courier-juma")).await.unwrap();
        let did = delivery.delivery_id.clone();
        assert_eq!(delivery.status, DeliveryStatusType::Pending);
        for status in [
            DeliveryStatusType::Accepted,
            DeliveryStatusType::PickedUp,
            DeliveryStatusType::InTransit,
            DeliveryStatusType::OutForDelivery,
        ] {
            api.update_delivery_status(&did, status, None, None).await.unwrap();
        }
        let delivered = api
            .update_delivery_status(&did, DeliveryStatusType::Delivered, Some("Gikomba market gate".into()), None)
            .await
            .unwrap();
        assert_eq!(delivered.status, DeliveryStatusType::Delivered);
        assert!(delivered.actual_delivery.is_some());
        // Cash was collected at the door; the owning order's payment settles.
        let order = db.fetch_order(&oid).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatusType::Completed);
        let log = api.tracking_log(&did).await.unwrap();
        assert_eq!(log.len(), 6);
        assert_eq!(log[0].event, "Delivery created");
        assert_eq!(log.last().unwrap().event, "Status changed to Delivered");
        assert_eq!(log.last().unwrap().location.as_deref(), Some("Gikomba market gate"));
    }

    #[tokio::test]
    async fn delivery_completion_never_settles_gateway_payments() {
        let (db, api) = test_setup().await;
        let oid = place_order(&db, PaymentMethod::Gateway).await;
        make_ready(&db, &oid).await;
        let delivery = api.create_delivery(NewDelivery::new(oid.clone(), "courier-juma")).await.unwrap();
        let did = delivery.delivery_id.clone();
        for status in [
            DeliveryStatusType::Accepted,
            DeliveryStatusType::PickedUp,
            DeliveryStatusType::InTransit,
            DeliveryStatusType::OutForDelivery,
            DeliveryStatusType::Delivered,
        ] {
            api.update_delivery_status(&did, status, None, None).await.unwrap();
        }
        let delivered = api.fetch_delivery(&did).await.unwrap().unwrap();
        assert!(delivered.actual_delivery.is_some());
        // No cash changed hands at the door; the gateway payment is still outstanding.
        let order = db.fetch_order(&oid).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatusType::Pending);
    }

    #[tokio::test]
    async fn the_delivery_graph_is_enforced() {
        let (db, api) = test_setup().await;
        let oid = place_order(&db, PaymentMethod::CashOnDelivery).await;
        make_ready(&db, &oid).await;
        let delivery = api.create_delivery(NewDelivery::new(oid, "courier-juma")).await.unwrap();
        let did = delivery.delivery_id.clone();
        let err = api.update_delivery_status(&did, DeliveryStatusType::Delivered, None, None).await.unwrap_err();
        assert!(matches!(
            err,
            MarketplaceError::IllegalDeliveryTransition {
                from: DeliveryStatusType::Pending,
                to: DeliveryStatusType::Delivered
            }
        ));
        // A delayed delivery can resume where it left off.
        api.update_delivery_status(&did, DeliveryStatusType::Accepted, None, None).await.unwrap();
        api.update_delivery_status(&did, DeliveryStatusType::PickedUp, None, None).await.unwrap();
        api.update_delivery_status(&did, DeliveryStatusType::Delayed, None, Some("Puncture on Thika road".into()))
            .await
            .unwrap();
        let resumed = api.update_delivery_status(&did, DeliveryStatusType::InTransit, None, None).await.unwrap();
        assert_eq!(resumed.status, DeliveryStatusType::InTransit);
        // Terminal states accept nothing further.
        api.update_delivery_status(&did, DeliveryStatusType::Cancelled, None, None).await.unwrap();
        let err = api.update_delivery_status(&did, DeliveryStatusType::Accepted, None, None).await.unwrap_err();
        assert!(matches!(err, MarketplaceError::IllegalDeliveryTransition { from: DeliveryStatusType::Cancelled, .. }));
    }

    #[tokio::test]
    async fn cold_chain_breaches_raise_alerts() {
        let (db, api) = test_setup().await;
        let oid = place_order(&db, PaymentMethod::CashOnDelivery).await;
        make_ready(&db, &oid).await;
        let delivery = api
            .create_delivery(NewDelivery::new(oid, "courier-juma").with_cold_chain(2.0, 8.0))
            .await
            .unwrap();
        let did = delivery.delivery_id.clone();
        let ok = api.record_telemetry(&did, NewTelemetry { temperature: 5.0, humidity: Some(80.0) }).await.unwrap();
        assert!(ok.is_none());
        let alert = api.record_telemetry(&did, NewTelemetry { temperature: 12.5, humidity: None }).await.unwrap();
        let alert = alert.expect("a reading above the band must alert");
        assert!(alert.message.contains("above the maximum"));
        let alert = api.record_telemetry(&did, NewTelemetry { temperature: -1.0, humidity: None }).await.unwrap();
        assert!(alert.expect("a reading below the band must alert").message.contains("below the minimum"));
        let mut conn = db.pool().acquire().await.unwrap();
        let alerts = crate::sqlite::db::deliveries::fetch_alerts(&did, &mut conn).await.unwrap();
        assert_eq!(alerts.len(), 2);
    }

    #[tokio::test]
    async fn telemetry_against_unmonitored_deliveries_never_alerts() {
        let (db, api) = test_setup().await;
        let oid = place_order(&db, PaymentMethod::CashOnDelivery).await;
        make_ready(&db, &oid).await;
        let delivery = api.create_delivery(NewDelivery::new(oid, "courier-juma")).await.unwrap();
        let did = delivery.delivery_id.clone();
        let alert = api.record_telemetry(&did, NewTelemetry { temperature: 40.0, humidity: None }).await.unwrap();
        assert!(alert.is_none());
        let err = api
            .record_telemetry(&DeliveryId::from("DEL-NOSUCH".to_string()), NewTelemetry { temperature: 5.0, humidity: None })
            .await
            .unwrap_err();
        assert!(matches!(err, MarketplaceError::DeliveryNotFound(_)));
    }
}
