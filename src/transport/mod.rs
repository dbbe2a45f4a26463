//! Transport seam.
//!
//! The connection sequencer only knows two traits: a [`Connector`] that opens a
//! connection for an [`Identity`], and the [`Transport`] it yields. Production
//! code uses [`WebSocketConnector`]; tests use the scripted [`MockConnector`].

pub mod error;
pub mod mock;
pub mod websocket;

pub use error::*;
pub use mock::{MockConnector, MockRemote};
pub use websocket::WebSocketConnector;

use async_trait::async_trait;

use crate::model::Identity;

#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, identity: &Identity) -> Result<Box<dyn Transport>, TransportError>;
}

/// One open connection. Owned exclusively by the connection sequencer.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Next inbound text frame; `None` once the peer has closed.
    ///
    /// Must be cancel-safe: it is polled inside `tokio::select!`.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    async fn close(&mut self);
}
