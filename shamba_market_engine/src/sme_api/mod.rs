mod delivery_api;
mod order_flow_api;
pub mod order_objects;

pub use delivery_api::DeliveryApi;
pub use order_flow_api::OrderFlowApi;
