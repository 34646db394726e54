//! Minting of the human-readable references used across the marketplace.
//!
//! Order and delivery ids are short, upper-case and unambiguous so they survive being read out over the phone or
//! typed into an SMS. Uniqueness is enforced by the database; at ten characters over a 32-symbol alphabet a
//! collision is a unique-constraint error, not something we retry for here.

use rand::Rng;

use crate::db_types::{DeliveryId, OrderId};

/// Crockford-style alphabet: no I, L, O or U, so ids cannot be misread.
const ALPHABET: &[u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const ID_LEN: usize = 10;

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN).map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char).collect()
}

pub fn new_order_id() -> OrderId {
    OrderId(format!("ORD-{}", random_suffix()))
}

pub fn new_delivery_id() -> DeliveryId {
    DeliveryId(format!("DEL-{}", random_suffix()))
}

/// The reference handed to the payment gateway at checkout. This is the idempotence key settlement callbacks
/// are matched on.
pub fn new_gateway_reference() -> String {
    format!("PAY-{}", random_suffix())
}
