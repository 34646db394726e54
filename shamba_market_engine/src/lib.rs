//! Shamba Market Engine
//!
//! The order lifecycle and inventory consistency core of the Shamba agricultural marketplace. Farmers and
//! input-sellers list stock, buyers place multi-item orders, logistics partners fulfil deliveries and an external
//! payment gateway settles funds. This library owns the parts of that flow where correctness is at stake:
//!
//! 1. **Inventory reservation** — placing an order atomically reserves stock for every line, or reserves nothing.
//! 2. **The order status machine** — the only legal transition graph for orders, encoded as data on
//!    [`db_types::OrderStatusType`] and enforced at the storage layer.
//! 3. **Payment reconciliation** — gateway callbacks are matched to exactly one payment record by their unique
//!    gateway reference and applied at most once, no matter how often the gateway retries.
//! 4. **Cancellation** — reserved stock flows back to the catalogue when an order is cancelled before fulfilment.
//!
//! The library is divided into two main sections:
//! 1. Storage management ([`SqliteDatabase`] and the contracts in the traits module). You should never need to
//!    access the database directly; use the public APIs instead. The exception is the data types, which are defined
//!    in [`db_types`] and are public.
//! 2. The public API layer: [`OrderFlowApi`] for order placement, status transitions, cancellation and payment
//!    reconciliation, and [`DeliveryApi`] for the logistics tracking extension.
//!
//! The engine also emits events when notable things happen (an order is placed, paid, cancelled, a cold-chain
//! alert fires). A simple actor-style hook framework lets callers subscribe and, for example, fan out
//! notifications. Hook failures are logged and never fail the operation that raised them.

pub mod db_types;
pub mod events;
pub mod helpers;
mod sme_api;
mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
mod sqlite;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use sme_api::{order_objects, DeliveryApi, OrderFlowApi};
pub use traits::{
    CatalogManagement,
    CheckoutSession,
    GatewayError,
    GatewayVerification,
    MarketplaceDatabase,
    MarketplaceError,
    PaymentGatewayClient,
    ReconciliationOutcome,
};
