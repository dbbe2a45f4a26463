use thiserror::Error;

/// A subscriber callback failed. Logged, never propagated to the publisher.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CallbackError {
    #[error("subscriber {id} on '{topic}' failed: {reason}")]
    Failed { topic: String, id: u64, reason: String },

    #[error("subscriber {id} on '{topic}' panicked: {message}")]
    Panicked { topic: String, id: u64, message: String },
}
