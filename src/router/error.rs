//! Error types for inbound message routing.

use thiserror::Error;

use crate::driver_projection::DriverError;
use crate::inventory_projection::InventoryError;
use crate::order_projection::OrderError;

/// A frame that cannot be turned into a usable envelope. Logged and dropped.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Malformed(String),

    #[error("envelope missing required field '{0}'")]
    MissingField(&'static str),

    #[error("envelope field '{field}' is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Well-formed, but a value this client does not know (e.g. a status added
    /// server-side). The envelope is still published.
    #[error("envelope field '{field}' has unrecognised value '{value}'")]
    UnrecognizedValue { field: &'static str, value: String },
}

impl EnvelopeError {
    /// Whether the envelope should still reach subscribers.
    pub fn is_publishable(&self) -> bool {
        matches!(self, EnvelopeError::UnrecognizedValue { .. })
    }
}

/// Failure inside a typed handler.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HandlerError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),
}
