//! Restaurant inventory projection (last-write-wins per menu item).

pub mod entity;
pub mod error;
pub mod stock;

pub use error::*;
pub use stock::*;

use std::time::Duration;

use crate::clients::InventoryClient;
use crate::framework::ProjectionActor;
use crate::model::InventoryProjection;

/// Creates a new inventory actor and its client.
pub fn new(
    buffer_size: usize,
    gc_interval: Option<Duration>,
) -> (ProjectionActor<InventoryProjection>, InventoryClient) {
    let (actor, generic_client) = ProjectionActor::new(buffer_size, gc_interval);
    (actor, InventoryClient::new(generic_client))
}
