//! Crate-level error type.

use thiserror::Error;

use crate::driver_projection::DriverError;
use crate::framework::FrameworkError;
use crate::inventory_projection::InventoryError;
use crate::order_projection::OrderError;
use crate::router::EnvelopeError;
use crate::services::ServiceError;
use crate::transport::TransportError;

/// Errors surfaced by [`RealtimeSystem`](crate::lifecycle::RealtimeSystem).
///
/// None of these is fatal to the host process; the worst outcome is stale
/// projections and an offline indicator.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// The reconnection policy reached its attempt ceiling.
    #[error("gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Framework(#[from] FrameworkError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("background task failed: {0}")]
    TaskFailed(String),
}
