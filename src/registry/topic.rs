//! Topic names.
//!
//! A topic is a plain string. Entity topics are derived from ids; message-type
//! topics are the raw `type` of the envelope (`order_update`, `promo_banner`, ...).

/// Connection lifecycle events (`connected`, `disconnected`, `reconnecting`, `failed`).
pub const CONNECTION: &str = "connection";

/// Published once when the reconnection policy gives up.
pub const CONNECTION_FAILED: &str = "connection_failed";

pub fn order(order_id: &str) -> String {
    format!("order_{order_id}")
}

pub fn driver_location(driver_id: &str) -> String {
    format!("driver_location_{driver_id}")
}

pub fn inventory(restaurant_id: &str) -> String {
    format!("inventory_{restaurant_id}")
}
