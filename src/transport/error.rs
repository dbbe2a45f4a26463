use thiserror::Error;

/// Transport I/O failures. Every one of them hands control to the reconnection
/// policy; the transport itself never retries.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("connect timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("send failed: {0}")]
    Send(String),

    #[error("receive failed: {0}")]
    Receive(String),

    #[error("connection closed by peer")]
    Closed,
}
