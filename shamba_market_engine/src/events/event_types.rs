use serde::{Deserialize, Serialize};

use crate::db_types::{ColdChainAlert, Delivery, DeliveryStatusType, FullOrder, Order, OrderStatusType};

/// A new order was placed and its stock reserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedEvent {
    pub order: FullOrder,
}

impl OrderPlacedEvent {
    pub fn new(order: FullOrder) -> Self {
        Self { order }
    }
}

/// A payment settled successfully and the order's payment status became `Completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// An order was cancelled and its reserved stock released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
    pub status: OrderStatusType,
}

impl OrderAnnulledEvent {
    pub fn new(order: Order) -> Self {
        let status = order.status;
        Self { order, status }
    }
}

/// A delivery moved to a new status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryUpdatedEvent {
    pub delivery: Delivery,
    pub status: DeliveryStatusType,
}

impl DeliveryUpdatedEvent {
    pub fn new(delivery: Delivery) -> Self {
        let status = delivery.status;
        Self { delivery, status }
    }
}

/// A cold-chain telemetry sample fell outside the configured band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColdChainAlertEvent {
    pub alert: ColdChainAlert,
}

impl ColdChainAlertEvent {
    pub fn new(alert: ColdChainAlert) -> Self {
        Self { alert }
    }
}
