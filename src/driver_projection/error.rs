//! Error types for the driver location projection.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DriverError {
    /// The location report could not be applied.
    #[error("Location rejected: {0}")]
    Rejected(String),

    /// An error occurred while communicating with the projection actor.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<String> for DriverError {
    fn from(msg: String) -> Self {
        DriverError::ActorCommunicationError(msg)
    }
}
