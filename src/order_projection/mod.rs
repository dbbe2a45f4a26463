//! Order lifecycle state machine: the projection every role derives from the
//! same event stream.

pub mod entity;
pub mod error;
pub mod update;

pub use error::*;
pub use update::*;

use std::time::Duration;

use crate::clients::OrderClient;
use crate::framework::ProjectionActor;
use crate::model::OrderProjection;

/// Creates a new order projection actor and its client.
pub fn new(buffer_size: usize, gc_interval: Option<Duration>) -> (ProjectionActor<OrderProjection>, OrderClient) {
    let (actor, generic_client) = ProjectionActor::new(buffer_size, gc_interval);
    (actor, OrderClient::new(generic_client))
}
