use serde::{Deserialize, Serialize};

use crate::db_types::{Order, Payment};

/// The result of applying one gateway settlement callback.
///
/// `Duplicate` and `Unmatched` are expected traffic for a webhook-based gateway that retries on non-2xx
/// responses; callers should treat all three variants as success towards the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReconciliationOutcome {
    /// The payment reached a terminal status; if it was linked to an order, the updated order is included.
    Applied { payment: Payment, order: Option<Order> },
    /// The payment was already terminal. Nothing was changed.
    Duplicate,
    /// No payment record carries this gateway reference. Nothing was changed.
    Unmatched,
}

impl ReconciliationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ReconciliationOutcome::Applied { .. })
    }
}
