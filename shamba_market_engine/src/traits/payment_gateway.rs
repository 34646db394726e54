use smp_common::Money;
use thiserror::Error;

use crate::db_types::SettlementOutcome;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("The payment gateway could not be reached: {0}")]
    Unreachable(String),
    #[error("The payment gateway rejected the request: {0}")]
    Rejected(String),
}

/// A checkout session opened at the gateway for a given reference.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub reference: String,
    pub checkout_url: String,
}

/// The gateway's answer to a verification poll.
#[derive(Debug, Clone)]
pub struct GatewayVerification {
    pub status: SettlementOutcome,
    pub amount: Money,
}

/// The narrow interface onto the external payment gateway.
///
/// The engine initialises checkout sessions and can poll for verification; settlement callbacks arrive through
/// [`crate::OrderFlowApi::reconcile_payment`]. The gateway's own settlement logic is out of scope.
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayClient {
    /// Opens a checkout session for `amount` under the engine-minted `reference`.
    async fn initialize(&self, amount: Money, currency: &str, reference: &str)
        -> Result<CheckoutSession, GatewayError>;

    /// Polls the gateway for the settlement status of `reference`.
    async fn verify(&self, reference: &str) -> Result<GatewayVerification, GatewayError>;
}
