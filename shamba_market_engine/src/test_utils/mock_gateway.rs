//! An in-memory stand-in for the external payment gateway.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use smp_common::Money;

use crate::{
    db_types::SettlementOutcome,
    traits::{CheckoutSession, GatewayError, GatewayVerification, PaymentGatewayClient},
};

/// Remembers every checkout session it opens and answers verification polls from that memory.
///
/// By default every session verifies as successful for the amount it was opened with. Individual references can
/// be overridden with [`MemoryGateway::set_outcome`], and [`MemoryGateway::set_unreachable`] makes every call
/// fail, for testing error paths.
#[derive(Clone, Default)]
pub struct MemoryGateway {
    sessions: Arc<Mutex<HashMap<String, Money>>>,
    outcomes: Arc<Mutex<HashMap<String, SettlementOutcome>>>,
    unreachable: Arc<Mutex<bool>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_outcome(&self, reference: &str, outcome: SettlementOutcome) {
        self.outcomes.lock().unwrap().insert(reference.to_string(), outcome);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.lock().unwrap() = unreachable;
    }

    pub fn session_amount(&self, reference: &str) -> Option<Money> {
        self.sessions.lock().unwrap().get(reference).copied()
    }
}

impl PaymentGatewayClient for MemoryGateway {
    async fn initialize(
        &self,
        amount: Money,
        _currency: &str,
        reference: &str,
    ) -> Result<CheckoutSession, GatewayError> {
        if *self.unreachable.lock().unwrap() {
            return Err(GatewayError::Unreachable("gateway offline".to_string()));
        }
        self.sessions.lock().unwrap().insert(reference.to_string(), amount);
        Ok(CheckoutSession {
            reference: reference.to_string(),
            checkout_url: format!("https://gateway.test/checkout/{reference}"),
        })
    }

    async fn verify(&self, reference: &str) -> Result<GatewayVerification, GatewayError> {
        if *self.unreachable.lock().unwrap() {
            return Err(GatewayError::Unreachable("gateway offline".to_string()));
        }
        let amount = self
            .session_amount(reference)
            .ok_or_else(|| GatewayError::Rejected(format!("unknown reference {reference}")))?;
        let status = self
            .outcomes
            .lock()
            .unwrap()
            .get(reference)
            .copied()
            .unwrap_or(SettlementOutcome::Success);
        Ok(GatewayVerification { status, amount })
    }
}
