use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::clients::{DriverLocationClient, InventoryClient, OrderClient};
use crate::config::RealtimeConfig;
use crate::connection::{ConnectionHandle, ConnectionManager};
use crate::error::RealtimeError;
use crate::model::{
    DriverLocationReport, Identity, InventoryReport, OrderStatus, OrderStatusReport, OutboundMessage,
};
use crate::registry::{Subscription, SubscriptionRegistry};
use crate::router::MessageRouter;
use crate::services::{AuthService, OrderRepository};
use crate::transport::{Connector, WebSocketConnector};

/// Thin coordinator wiring the realtime components together.
///
/// `RealtimeSystem` is responsible for:
/// - **Lifecycle Management**: starting and stopping the sequencer, router and projection actors
/// - **Dependency Wiring**: handing the projection clients to the router
/// - **Consumer API**: `subscribe`, `send_message` and the typed outbound helpers
///
/// There is no global instance; every call to [`RealtimeSystem::start`] builds
/// an independent one.
///
/// # Example
///
/// ```ignore
/// let system = RealtimeSystem::websocket(&config, Identity::new("user_1", Role::Customer));
/// let _sub = system.subscribe("order_o1", |data| {
///     println!("order changed: {data}");
///     Ok(())
/// });
/// // ...
/// system.shutdown().await?;
/// ```
pub struct RealtimeSystem {
    /// Send side of the single transport connection.
    pub connection: ConnectionHandle,

    pub registry: SubscriptionRegistry,

    pub orders: OrderClient,
    pub drivers: DriverLocationClient,
    pub inventory: InventoryClient,

    identity: Identity,

    /// Task handles for every background task (used for graceful shutdown)
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl RealtimeSystem {
    /// Spawns the projection actors, the router and the connection sequencer.
    ///
    /// Must be called within a Tokio runtime. Connecting starts immediately.
    pub fn start(config: &RealtimeConfig, identity: Identity, connector: Arc<dyn Connector>) -> Self {
        // 1. Projection actors (no dependencies)
        let gc_interval = config.gc_interval();
        let (order_actor, orders) = crate::order_projection::new(config.projection_buffer, gc_interval);
        let (driver_actor, drivers) =
            crate::driver_projection::new(config.projection_buffer, gc_interval, config.driver_idle_after());
        let (inventory_actor, inventory) = crate::inventory_projection::new(config.projection_buffer, None);

        // 2. Router, fed with raw frames by the sequencer
        let registry = SubscriptionRegistry::new(config.subscriber_queue_capacity);
        let router = MessageRouter::with_projections(
            registry.clone(),
            orders.clone(),
            drivers.clone(),
            inventory.clone(),
            config.assumed_speed_kmh,
        );
        let (frames_tx, frames_rx) = mpsc::channel(config.frame_capacity.max(1));

        // 3. Connection sequencer
        let (manager, connection) = ConnectionManager::new(
            identity.clone(),
            connector,
            config.connection_settings(),
            registry.clone(),
            frames_tx,
        );

        let handles = vec![
            ("orders", tokio::spawn(order_actor.run())),
            ("drivers", tokio::spawn(driver_actor.run())),
            ("inventory", tokio::spawn(inventory_actor.run())),
            ("router", tokio::spawn(router.run(frames_rx))),
            ("connection", tokio::spawn(manager.run())),
        ];
        info!(user_id = %identity.user_id, role = %identity.role, url = %config.url, "Realtime system started");

        Self {
            connection,
            registry,
            orders,
            drivers,
            inventory,
            identity,
            handles,
        }
    }

    /// [`RealtimeSystem::start`] against `config.url` over WebSocket.
    pub fn websocket(config: &RealtimeConfig, identity: Identity) -> Self {
        let connector = Arc::new(WebSocketConnector::new(config.url.clone()));
        Self::start(config, identity, connector)
    }

    /// Resolves the identity from `auth`, then starts.
    pub async fn connect(
        config: &RealtimeConfig,
        auth: &dyn AuthService,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, RealtimeError> {
        let identity = auth.current_identity().await?;
        Ok(Self::start(config, identity, connector))
    }

    /// Seeds order projections from persisted state. Live state already
    /// received wins. Returns how many orders were inserted.
    pub async fn hydrate(&self, repository: &dyn OrderRepository) -> Result<usize, RealtimeError> {
        let orders = repository.active_orders(&self.identity).await?;
        let total = orders.len();
        let mut inserted = 0;
        for order in orders {
            if self.orders.seed(order).await? {
                inserted += 1;
            }
        }
        info!(total, inserted, "Hydrated order projections");
        Ok(inserted)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn subscribe<F>(&self, topic: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.registry.subscribe(topic, callback)
    }

    /// Fire-and-forget; a no-op while disconnected.
    pub fn send_message(&self, kind: &str, data: Value) -> bool {
        self.connection.send(kind, data)
    }

    pub fn update_driver_location(&self, report: DriverLocationReport) -> bool {
        self.connection.send_outbound(&OutboundMessage::DriverLocationUpdate(report))
    }

    pub fn update_inventory(&self, report: InventoryReport) -> bool {
        self.connection.send_outbound(&OutboundMessage::InventoryUpdate(report))
    }

    pub fn update_order_status(&self, order_id: impl Into<String>, status: OrderStatus, notes: Option<String>) -> bool {
        self.connection.send_outbound(&OutboundMessage::OrderStatusUpdate(OrderStatusReport {
            order_id: order_id.into(),
            status: status.as_str().to_string(),
            notes,
        }))
    }

    /// External reconnect trigger (e.g. app foregrounding).
    pub fn reconnect(&self) {
        self.connection.reconnect();
    }

    /// Gracefully shuts down the entire system.
    ///
    /// Closing the connection stops the sequencer, which closes the frame
    /// channel and stops the router. Dropping the remaining clients then
    /// closes the projection actors' mailboxes.
    pub async fn shutdown(self) -> Result<(), RealtimeError> {
        info!("Shutting down realtime system...");

        self.connection.close().await;
        drop(self.connection);
        drop(self.orders);
        drop(self.drivers);
        drop(self.inventory);
        self.registry.clear();

        for (name, handle) in self.handles {
            if let Err(e) = handle.await {
                error!(task = name, "Task failed: {:?}", e);
                return Err(RealtimeError::TaskFailed(format!("{name}: {e}")));
            }
        }

        info!("Realtime system shutdown complete.");
        Ok(())
    }
}
