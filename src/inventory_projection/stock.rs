use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::model::{Envelope, InventoryKey};
use crate::router::EnvelopeError;

/// A stock level report decoded from an `inventory_update` envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct StockLevel {
    pub current_stock: i64,
    pub is_available: bool,
    pub at: DateTime<Utc>,
}

impl StockLevel {
    pub fn from_envelope(envelope: &Envelope) -> Result<(InventoryKey, Self), EnvelopeError> {
        let restaurant_id = envelope
            .restaurant_id()
            .ok_or(EnvelopeError::MissingField("restaurantId"))?;
        let menu_item_id = envelope
            .data_str("menuItemId")
            .ok_or(EnvelopeError::MissingField("menuItemId"))?;
        let current_stock = envelope
            .data
            .get("currentStock")
            .and_then(Value::as_i64)
            .ok_or(EnvelopeError::MissingField("currentStock"))?;
        // Older servers omit the flag; anything in stock is orderable.
        let is_available = envelope
            .data
            .get("isAvailable")
            .and_then(Value::as_bool)
            .unwrap_or(current_stock > 0);

        Ok((
            InventoryKey::new(restaurant_id, menu_item_id),
            StockLevel {
                current_stock,
                is_available,
                at: envelope.timestamp,
            },
        ))
    }
}
