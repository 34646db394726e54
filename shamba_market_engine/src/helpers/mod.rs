mod ids;

pub use ids::{new_delivery_id, new_gateway_reference, new_order_id};
