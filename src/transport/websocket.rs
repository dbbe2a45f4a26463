use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::model::Identity;

use super::{Connector, Transport, TransportError};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens `ws://` / `wss://` connections with `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Connect URL with the `userId` and `userType` query parameters.
    pub fn url_for(&self, identity: &Identity) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}userId={}&userType={}",
            self.url,
            separator,
            urlencoding::encode(&identity.user_id),
            identity.role.as_str()
        )
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, identity: &Identity) -> Result<Box<dyn Transport>, TransportError> {
        let url = self.url_for(identity);
        debug!(%url, "Opening WebSocket");
        let (socket, response) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        info!(status = %response.status(), "WebSocket connected");

        let (sink, stream) = socket.split();
        Ok(Box::new(WebSocketTransport { sink, stream }))
    }
}

struct WebSocketTransport {
    sink: SplitSink<Socket, Message>,
    stream: SplitStream<Socket>,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.sink
            .send(Message::text(frame))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => debug!("Ignoring non UTF-8 binary frame"),
                },
                Ok(Message::Ping(payload)) => {
                    if let Err(e) = self.sink.send(Message::Pong(payload)).await {
                        return Some(Err(TransportError::Send(e.to_string())));
                    }
                }
                Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Close frame received");
                    return None;
                }
                Err(e) => return Some(Err(TransportError::Receive(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;

    #[test]
    fn url_carries_identity() {
        let connector = WebSocketConnector::new("ws://localhost:8080/ws");
        let identity = Identity::new("user 1", Role::Driver);
        assert_eq!(
            connector.url_for(&identity),
            "ws://localhost:8080/ws?userId=user%201&userType=driver"
        );

        let connector = WebSocketConnector::new("wss://example.com/ws?v=2");
        assert!(connector.url_for(&identity).starts_with("wss://example.com/ws?v=2&userId="));
    }
}
