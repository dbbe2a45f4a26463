//! Error types for the order projection.

use thiserror::Error;

/// Errors that can occur while reading or updating order projections.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    /// The requested order has no projection.
    #[error("Order not found: {0}")]
    NotFound(String),

    /// The update could not be applied to the order.
    #[error("Order update rejected: {0}")]
    Rejected(String),

    /// An error occurred while communicating with the projection actor.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<String> for OrderError {
    fn from(msg: String) -> Self {
        OrderError::ActorCommunicationError(msg)
    }
}
