use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    ColdChainAlertEvent,
    DeliveryUpdatedEvent,
    EventHandler,
    EventProducer,
    Handler,
    OrderAnnulledEvent,
    OrderPaidEvent,
    OrderPlacedEvent,
};

/// The producer ends of every configured hook. Cloned into the API objects, which publish as a side effect of
/// the flows they run.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_placed_producer: Vec<EventProducer<OrderPlacedEvent>>,
    pub order_paid_producer: Vec<EventProducer<OrderPaidEvent>>,
    pub order_annulled_producer: Vec<EventProducer<OrderAnnulledEvent>>,
    pub delivery_updated_producer: Vec<EventProducer<DeliveryUpdatedEvent>>,
    pub cold_chain_alert_producer: Vec<EventProducer<ColdChainAlertEvent>>,
}

pub struct EventHandlers {
    pub on_order_placed: Option<EventHandler<OrderPlacedEvent>>,
    pub on_order_paid: Option<EventHandler<OrderPaidEvent>>,
    pub on_order_annulled: Option<EventHandler<OrderAnnulledEvent>>,
    pub on_delivery_updated: Option<EventHandler<DeliveryUpdatedEvent>>,
    pub on_cold_chain_alert: Option<EventHandler<ColdChainAlertEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        Self {
            on_order_placed: hooks.on_order_placed.map(|f| EventHandler::new(buffer_size, f)),
            on_order_paid: hooks.on_order_paid.map(|f| EventHandler::new(buffer_size, f)),
            on_order_annulled: hooks.on_order_annulled.map(|f| EventHandler::new(buffer_size, f)),
            on_delivery_updated: hooks.on_delivery_updated.map(|f| EventHandler::new(buffer_size, f)),
            on_cold_chain_alert: hooks.on_cold_chain_alert.map(|f| EventHandler::new(buffer_size, f)),
        }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_placed {
            result.order_placed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_paid {
            result.order_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_annulled {
            result.order_annulled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_delivery_updated {
            result.delivery_updated_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_cold_chain_alert {
            result.cold_chain_alert_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_placed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_paid {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_annulled {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_delivery_updated {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_cold_chain_alert {
            tokio::spawn(handler.start_handler());
        }
    }
}

/// Subscription points for the notification collaborator and other listeners.
#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_placed: Option<Handler<OrderPlacedEvent>>,
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_order_annulled: Option<Handler<OrderAnnulledEvent>>,
    pub on_delivery_updated: Option<Handler<DeliveryUpdatedEvent>>,
    pub on_cold_chain_alert: Option<Handler<ColdChainAlertEvent>>,
}

impl EventHooks {
    pub fn on_order_placed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPlacedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_placed = Some(Arc::new(f));
        self
    }

    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPaidEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f));
        self
    }

    pub fn on_order_annulled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderAnnulledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_annulled = Some(Arc::new(f));
        self
    }

    pub fn on_delivery_updated<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DeliveryUpdatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_delivery_updated = Some(Arc::new(f));
        self
    }

    pub fn on_cold_chain_alert<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ColdChainAlertEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_cold_chain_alert = Some(Arc::new(f));
        self
    }
}
