//! # Message Router
//!
//! Classifies inbound envelopes by `type`, hands them to the typed handler
//! (which updates projections), then publishes `data` on every topic the
//! envelope maps to:
//!
//! | envelope carries  | topic                      |
//! |-------------------|----------------------------|
//! | always            | the raw `type`             |
//! | `orderId`         | `order_<orderId>`          |
//! | `driverId`        | `driver_location_<id>` (`driver_location` only) |
//! | `restaurantId`    | `inventory_<restaurantId>` (`inventory_update` only) |
//!
//! Projections are updated before publishing, so a callback reading projected
//! state sees the new value. Unknown types are published under their raw type.

pub mod error;
pub mod handlers;

pub use error::*;
pub use handlers::*;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::clients::{DriverLocationClient, InventoryClient, OrderClient};
use crate::model::{Envelope, MessageType};
use crate::registry::{topic, SubscriptionRegistry};

pub struct MessageRouter {
    registry: SubscriptionRegistry,
    handlers: HashMap<MessageType, Arc<dyn EnvelopeHandler>>,
}

impl MessageRouter {
    /// A router with no typed handlers; envelopes are only published.
    pub fn new(registry: SubscriptionRegistry) -> Self {
        Self {
            registry,
            handlers: HashMap::new(),
        }
    }

    /// A router with the standard handlers wired to the projection clients.
    pub fn with_projections(
        registry: SubscriptionRegistry,
        orders: OrderClient,
        drivers: DriverLocationClient,
        inventory: InventoryClient,
        speed_kmh: f64,
    ) -> Self {
        Self::new(registry)
            .register(MessageType::OrderUpdate, OrderUpdateHandler { orders: orders.clone() })
            .register(
                MessageType::DriverAssignment,
                DriverAssignmentHandler { orders: orders.clone() },
            )
            .register(
                MessageType::DriverLocation,
                DriverLocationHandler { drivers, orders, speed_kmh },
            )
            .register(MessageType::InventoryUpdate, InventoryHandler { inventory })
            .register(MessageType::SystemNotification, SystemNotificationHandler)
    }

    /// Adds or replaces the handler for `kind`.
    pub fn register(mut self, kind: MessageType, handler: impl EnvelopeHandler + 'static) -> Self {
        self.handlers.insert(kind, Arc::new(handler));
        self
    }

    /// Parses and routes one raw text frame.
    pub async fn route_frame(&self, frame: &str) -> Result<(), EnvelopeError> {
        let envelope = Envelope::parse(frame)?;
        self.route(Arc::new(envelope)).await
    }

    /// Runs the typed handler, then publishes.
    ///
    /// An envelope the handler cannot decode is dropped without publishing,
    /// unless it only carries a value this client does not know yet.
    /// Projection failures are logged and the envelope is still published.
    pub async fn route(&self, envelope: Arc<Envelope>) -> Result<(), EnvelopeError> {
        let handler = envelope
            .message_type()
            .and_then(|kind| self.handlers.get(&kind));

        if let Some(handler) = handler {
            match handler.handle(&envelope).await {
                Ok(()) => {}
                Err(HandlerError::Envelope(e)) if e.is_publishable() => {
                    info!(kind = %envelope.kind, error = %e, "Projection skipped")
                }
                Err(HandlerError::Envelope(e)) => return Err(e),
                Err(e) => warn!(kind = %envelope.kind, error = %e, "Projection update failed"),
            }
        }

        let topics = Self::topics_for(&envelope);
        let mut delivered = 0;
        for topic in &topics {
            delivered += self.registry.publish(topic, envelope.data.clone());
        }
        debug!(kind = %envelope.kind, ?topics, delivered, "Routed");
        Ok(())
    }

    /// Every topic an envelope is published under, raw type first.
    pub fn topics_for(envelope: &Envelope) -> Vec<String> {
        let mut topics = vec![envelope.kind.clone()];
        if let Some(order_id) = envelope.order_id() {
            topics.push(topic::order(order_id));
        }
        match envelope.message_type() {
            Some(MessageType::DriverLocation) => {
                if let Some(driver_id) = envelope.driver_id() {
                    topics.push(topic::driver_location(driver_id));
                }
            }
            Some(MessageType::InventoryUpdate) => {
                if let Some(restaurant_id) = envelope.restaurant_id() {
                    topics.push(topic::inventory(restaurant_id));
                }
            }
            _ => {}
        }
        topics
    }

    /// Routes frames until the sender side closes.
    pub async fn run(self, mut frames: mpsc::Receiver<String>) {
        info!(handlers = self.handlers.len(), "Router started");
        while let Some(frame) = frames.recv().await {
            if let Err(e) = self.route_frame(&frame).await {
                warn!(error = %e, "Dropping malformed frame");
            }
        }
        info!("Router stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ProjectionView;
    use crate::model::OrderStatus;
    use serde_json::{json, Value};
    use std::time::Duration;

    struct Fixture {
        router: MessageRouter,
        registry: SubscriptionRegistry,
        orders: OrderClient,
        drivers: DriverLocationClient,
        inventory: InventoryClient,
    }

    fn fixture() -> Fixture {
        let registry = SubscriptionRegistry::new(16);
        let (order_actor, orders) = crate::order_projection::new(16, None);
        let (driver_actor, drivers) = crate::driver_projection::new(16, None, None);
        let (inventory_actor, inventory) = crate::inventory_projection::new(16, None);
        tokio::spawn(order_actor.run());
        tokio::spawn(driver_actor.run());
        tokio::spawn(inventory_actor.run());
        let router = MessageRouter::with_projections(
            registry.clone(),
            orders.clone(),
            drivers.clone(),
            inventory.clone(),
            30.0,
        );
        Fixture { router, registry, orders, drivers, inventory }
    }

    fn listen(registry: &SubscriptionRegistry, topic: &str) -> mpsc::UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = registry.subscribe(topic, move |data| {
            let _ = tx.send(data.clone());
            Ok(())
        });
        rx
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out")
            .expect("closed")
    }

    fn frame(kind: &str, data: Value) -> String {
        json!({"type": kind, "data": data, "timestamp": "2024-05-01T12:00:00Z"}).to_string()
    }

    #[tokio::test]
    async fn test_order_update_is_projected_then_published_on_both_topics() {
        let f = fixture();
        let mut by_type = listen(&f.registry, "order_update");
        let mut by_order = listen(&f.registry, "order_o1");

        f.router
            .route_frame(&frame("order_update", json!({"orderId": "o1", "status": "preparing"})))
            .await
            .unwrap();

        assert_eq!(next(&mut by_type).await["status"], "preparing");
        assert_eq!(next(&mut by_order).await["status"], "preparing");
        assert_eq!(f.orders.status("o1").await, Ok(OrderStatus::Preparing));
    }

    #[tokio::test]
    async fn test_unknown_type_is_published_under_raw_type() {
        let f = fixture();
        let mut rx = listen(&f.registry, "promo_banner");
        f.router
            .route_frame(&frame("promo_banner", json!({"text": "free fries"})))
            .await
            .unwrap();
        assert_eq!(next(&mut rx).await, json!({"text": "free fries"}));
    }

    #[tokio::test]
    async fn test_malformed_frames_are_errors_and_not_published() {
        let f = fixture();
        assert!(matches!(f.router.route_frame("{oops").await, Err(EnvelopeError::Malformed(_))));

        let mut rx = listen(&f.registry, "order_update");
        let result = f
            .router
            .route_frame(&frame("order_update", json!({"status": "ready"})))
            .await;
        assert_eq!(result, Err(EnvelopeError::MissingField("orderId")));
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_driver_location_updates_driver_and_order_eta() {
        let f = fixture();
        f.router
            .route_frame(&frame("driver_assignment", json!({"orderId": "o1", "driverId": "d1"})))
            .await
            .unwrap();
        let mut rx = listen(&f.registry, "driver_location_d1");

        f.router
            .route_frame(&frame(
                "driver_location",
                json!({"driverId": "d1", "latitude": 40.7580, "longitude": -73.9855, "estimatedMinutes": 9}),
            ))
            .await
            .unwrap();

        assert_eq!(next(&mut rx).await["latitude"], 40.7580);
        let driver = f.drivers.get("d1".into()).await.unwrap().unwrap();
        assert_eq!(driver.longitude, -73.9855);
        let order = f.orders.get("o1".into()).await.unwrap().unwrap();
        assert_eq!(order.eta.map(|eta| eta.minutes), Some(9.0));
    }

    #[tokio::test]
    async fn test_inventory_update_publishes_restaurant_topic() {
        let f = fixture();
        let mut rx = listen(&f.registry, "inventory_r1");
        f.router
            .route_frame(&frame(
                "inventory_update",
                json!({"restaurantId": "r1", "menuItemId": "m1", "currentStock": 3}),
            ))
            .await
            .unwrap();

        assert_eq!(next(&mut rx).await["currentStock"], 3);
        let items = f.inventory.for_restaurant("r1").await.unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].is_available);
    }

    #[tokio::test]
    async fn test_unrecognised_status_is_published_without_touching_projection() {
        let f = fixture();
        f.router
            .route_frame(&frame("order_update", json!({"orderId": "o1", "status": "ready"})))
            .await
            .unwrap();
        let mut by_type = listen(&f.registry, "order_update");
        let mut by_order = listen(&f.registry, "order_o1");

        f.router
            .route_frame(&frame("order_update", json!({"orderId": "o1", "status": "drone_dispatched"})))
            .await
            .unwrap();

        assert_eq!(next(&mut by_type).await["status"], "drone_dispatched");
        assert_eq!(next(&mut by_order).await["status"], "drone_dispatched");
        assert_eq!(f.orders.status("o1").await, Ok(OrderStatus::Ready));
    }

    #[tokio::test]
    async fn test_rejected_projection_update_is_still_published() {
        let f = fixture();
        let mut rx = listen(&f.registry, "inventory_update");
        f.router
            .route_frame(&frame(
                "inventory_update",
                json!({"restaurantId": "r1", "menuItemId": "m1", "currentStock": -1}),
            ))
            .await
            .unwrap();
        assert_eq!(next(&mut rx).await["currentStock"], -1);
        assert!(f.inventory.for_restaurant("r1").await.unwrap().is_empty());
    }

    #[test]
    fn topics_for_entity_envelopes() {
        let envelope = Envelope {
            order_id: Some("o9".into()),
            ..Envelope::new("order_update", json!({}))
        };
        assert_eq!(MessageRouter::topics_for(&envelope), vec!["order_update", "order_o9"]);

        // driverId on an order update does not imply a location topic
        let envelope = Envelope::new("order_update", json!({"orderId": "o9", "driverId": "d1"}));
        assert_eq!(MessageRouter::topics_for(&envelope), vec!["order_update", "order_o9"]);
    }
}
