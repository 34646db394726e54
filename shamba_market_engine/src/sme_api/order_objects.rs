use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{OrderId, OrderStatusType, PaymentStatusType};

/// Search criteria for the order query surface. Empty fields are not filtered on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub order_id: Option<OrderId>,
    pub buyer_id: Option<String>,
    pub seller_id: Option<String>,
    pub status: Option<Vec<OrderStatusType>>,
    pub payment_status: Option<PaymentStatusType>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_buyer_id<S: Into<String>>(mut self, buyer_id: S) -> Self {
        self.buyer_id = Some(buyer_id.into());
        self
    }

    pub fn with_seller_id<S: Into<String>>(mut self, seller_id: S) -> Self {
        self.seller_id = Some(seller_id.into());
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn with_payment_status(mut self, status: PaymentStatusType) -> Self {
        self.payment_status = Some(status);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.order_id.is_none()
            && self.buyer_id.is_none()
            && self.seller_id.is_none()
            && self.status.as_ref().map(|s| s.is_empty()).unwrap_or(true)
            && self.payment_status.is_none()
            && self.since.is_none()
            && self.until.is_none()
    }
}
