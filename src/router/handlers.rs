//! Typed handlers, one per known [`MessageType`](crate::model::MessageType).
//!
//! Each handler folds the envelope into the relevant projection. Publishing to
//! topics is the router's job, not theirs.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::clients::{DriverLocationClient, InventoryClient, OrderClient};
use crate::driver_projection::LocationFix;
use crate::inventory_projection::StockLevel;
use crate::model::Envelope;
use crate::order_projection::OrderUpdate;

use super::error::HandlerError;

#[async_trait]
pub trait EnvelopeHandler: Send + Sync {
    async fn handle(&self, envelope: &Envelope) -> Result<(), HandlerError>;
}

/// `order_update`: status changes, possibly carrying the first driver.
pub struct OrderUpdateHandler {
    pub orders: OrderClient,
}

#[async_trait]
impl EnvelopeHandler for OrderUpdateHandler {
    async fn handle(&self, envelope: &Envelope) -> Result<(), HandlerError> {
        let (order_id, update) = OrderUpdate::from_order_update(envelope)?;
        self.orders.apply(order_id, update).await?;
        Ok(())
    }
}

/// `driver_assignment`.
pub struct DriverAssignmentHandler {
    pub orders: OrderClient,
}

#[async_trait]
impl EnvelopeHandler for DriverAssignmentHandler {
    async fn handle(&self, envelope: &Envelope) -> Result<(), HandlerError> {
        let (order_id, update) = OrderUpdate::from_driver_assignment(envelope)?;
        self.orders.apply(order_id, update).await?;
        Ok(())
    }
}

/// `driver_location`: overwrites the driver's position, then recomputes the
/// ETA of every live order that driver is assigned to.
pub struct DriverLocationHandler {
    pub drivers: DriverLocationClient,
    pub orders: OrderClient,
    pub speed_kmh: f64,
}

#[async_trait]
impl EnvelopeHandler for DriverLocationHandler {
    async fn handle(&self, envelope: &Envelope) -> Result<(), HandlerError> {
        let (driver_id, fix) = LocationFix::from_envelope(envelope)?;
        let updated = self
            .orders
            .update_eta_for_driver(&driver_id, &fix, self.speed_kmh)
            .await?;
        if !updated.is_empty() {
            debug!(%driver_id, orders = ?updated, "ETA recomputed");
        }
        self.drivers.record(driver_id, fix).await?;
        Ok(())
    }
}

/// `inventory_update`.
pub struct InventoryHandler {
    pub inventory: InventoryClient,
}

#[async_trait]
impl EnvelopeHandler for InventoryHandler {
    async fn handle(&self, envelope: &Envelope) -> Result<(), HandlerError> {
        let (key, level) = StockLevel::from_envelope(envelope)?;
        self.inventory.record(key, level).await?;
        Ok(())
    }
}

/// `system_notification`: no projection, only logged. Consumers subscribe to the topic.
pub struct SystemNotificationHandler;

#[async_trait]
impl EnvelopeHandler for SystemNotificationHandler {
    async fn handle(&self, envelope: &Envelope) -> Result<(), HandlerError> {
        let title = envelope.data_str("title").unwrap_or("");
        match envelope.data_str("message") {
            Some(message) => info!(title, message, "System notification"),
            None => warn!(title, "System notification without message"),
        }
        Ok(())
    }
}
