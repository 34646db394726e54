//! Contracts between the engine and its collaborators.
//!
//! * [`MarketplaceDatabase`] is the storage contract for the order lifecycle core: atomic placement with inventory
//!   reservation, serialized status transitions, idempotent payment settlement and delivery tracking. Backends
//!   (currently SQLite) implement this trait; the public APIs are generic over it.
//! * [`CatalogManagement`] is the narrow read/seed boundary onto the item catalogue. Catalogue CRUD proper lives
//!   outside this engine; the core only looks items up and adjusts stock through reservations.
//! * [`PaymentGatewayClient`] is the narrow interface onto the external payment gateway. The engine never talks to
//!   the gateway's HTTP API directly.

mod catalog_management;
mod data_objects;
mod marketplace_database;
mod payment_gateway;

pub use catalog_management::CatalogManagement;
pub use data_objects::ReconciliationOutcome;
pub use marketplace_database::{MarketplaceDatabase, MarketplaceError};
pub use payment_gateway::{CheckoutSession, GatewayError, GatewayVerification, PaymentGatewayClient};
