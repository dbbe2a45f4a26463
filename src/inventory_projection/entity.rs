use crate::framework::{Outcome, Projection};
use crate::model::{InventoryKey, InventoryProjection};

use super::stock::StockLevel;

impl Projection for InventoryProjection {
    type Id = InventoryKey;
    type Update = StockLevel;

    fn new(key: InventoryKey) -> Self {
        Self::new(key)
    }

    fn id(&self) -> &InventoryKey {
        &self.key
    }

    fn apply(&mut self, level: StockLevel) -> Result<Outcome, String> {
        if level.current_stock < 0 {
            return Err(format!("negative stock level: {}", level.current_stock));
        }
        self.current_stock = level.current_stock;
        self.is_available = level.is_available;
        self.last_updated = level.at;
        Ok(Outcome::Changed)
    }
}
