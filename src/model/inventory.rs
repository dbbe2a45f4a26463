use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Identifies one menu item's stock at one restaurant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryKey {
    pub restaurant_id: String,
    pub menu_item_id: String,
}

impl InventoryKey {
    pub fn new(restaurant_id: impl Into<String>, menu_item_id: impl Into<String>) -> Self {
        Self {
            restaurant_id: restaurant_id.into(),
            menu_item_id: menu_item_id.into(),
        }
    }
}

impl fmt::Display for InventoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.restaurant_id, self.menu_item_id)
    }
}

/// Last-known stock level for a menu item (last-write-wins).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryProjection {
    pub key: InventoryKey,
    pub current_stock: i64,
    pub is_available: bool,
    pub last_updated: DateTime<Utc>,
}

impl InventoryProjection {
    pub fn new(key: InventoryKey) -> Self {
        Self {
            key,
            current_stock: 0,
            is_available: false,
            last_updated: Utc::now(),
        }
    }
}
