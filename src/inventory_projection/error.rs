//! Error types for the inventory projection.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum InventoryError {
    /// The stock report could not be applied (e.g. negative stock).
    #[error("Stock update rejected: {0}")]
    Rejected(String),

    /// An error occurred while communicating with the projection actor.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<String> for InventoryError {
    fn from(msg: String) -> Self {
        InventoryError::ActorCommunicationError(msg)
    }
}
