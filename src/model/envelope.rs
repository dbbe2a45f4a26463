//! Wire envelopes exchanged with the realtime server.
//!
//! Every frame on the socket is a JSON [`Envelope`]:
//!
//! ```text
//! { "type": "order_update", "data": { ... }, "timestamp": "2024-05-01T12:00:00Z",
//!   "userId": "...", "orderId": "...", "driverId": "...", "restaurantId": "..." }
//! ```
//!
//! Inbound envelopes are immutable once parsed and are shared as `Arc<Envelope>`.
//! Outbound messages are built from [`OutboundMessage`] and wrapped in the same shape.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::router::EnvelopeError;

/// Message types the client understands.
///
/// Anything else is still routed (under its raw type name) but has no typed handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    OrderUpdate,
    DriverLocation,
    InventoryUpdate,
    DriverAssignment,
    SystemNotification,
    /// Client → server liveness beat.
    Heartbeat,
}

impl MessageType {
    pub const ALL: [MessageType; 6] = [
        MessageType::OrderUpdate,
        MessageType::DriverLocation,
        MessageType::InventoryUpdate,
        MessageType::DriverAssignment,
        MessageType::SystemNotification,
        MessageType::Heartbeat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::OrderUpdate => "order_update",
            MessageType::DriverLocation => "driver_location",
            MessageType::InventoryUpdate => "inventory_update",
            MessageType::DriverAssignment => "driver_assignment",
            MessageType::SystemNotification => "system_notification",
            MessageType::Heartbeat => "heartbeat",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown message type: {s}"))
    }
}

/// A single typed message received over (or sent on) the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_id: Option<String>,
}

impl Envelope {
    /// Builds an envelope stamped with the current time.
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
            timestamp: Utc::now(),
            user_id: None,
            order_id: None,
            driver_id: None,
            restaurant_id: None,
        }
    }

    /// Parses and validates a raw text frame.
    ///
    /// `type` must be non-empty and `data` must be a JSON object (or `null`,
    /// which is normalised to an empty object).
    pub fn parse(frame: &str) -> Result<Self, EnvelopeError> {
        let mut envelope: Envelope =
            serde_json::from_str(frame).map_err(|e| EnvelopeError::Malformed(e.to_string()))?;

        if envelope.kind.trim().is_empty() {
            return Err(EnvelopeError::MissingField("type"));
        }
        match envelope.data {
            Value::Object(_) => {}
            Value::Null => envelope.data = Value::Object(Map::new()),
            _ => return Err(EnvelopeError::InvalidField {
                field: "data",
                reason: "expected a JSON object".into(),
            }),
        }
        Ok(envelope)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// The typed message kind, if this client knows it.
    pub fn message_type(&self) -> Option<MessageType> {
        self.kind.parse().ok()
    }

    /// Order id from the envelope header, falling back to `data.orderId`.
    pub fn order_id(&self) -> Option<&str> {
        self.order_id.as_deref().or_else(|| self.data_str("orderId"))
    }

    /// Driver id from the envelope header, falling back to `data.driverId`.
    pub fn driver_id(&self) -> Option<&str> {
        self.driver_id.as_deref().or_else(|| self.data_str("driverId"))
    }

    /// Restaurant id from the envelope header, falling back to `data.restaurantId`.
    pub fn restaurant_id(&self) -> Option<&str> {
        self.restaurant_id
            .as_deref()
            .or_else(|| self.data_str("restaurantId"))
    }

    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    pub fn data_f64(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(Value::as_f64)
    }
}

// =============================================================================
// OUTBOUND MESSAGES
// =============================================================================

/// Driver position report sent by the driver app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverLocationReport {
    pub latitude: f64,
    pub longitude: f64,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub accuracy: Option<f64>,
}

/// Stock change sent by the restaurant app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryReport {
    pub restaurant_id: String,
    pub menu_item_id: String,
    pub current_stock: i64,
    pub is_available: bool,
}

/// Order status change sent by restaurant or driver apps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusReport {
    pub order_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Client → server messages with a known shape.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    DriverLocationUpdate(DriverLocationReport),
    InventoryUpdate(InventoryReport),
    OrderStatusUpdate(OrderStatusReport),
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::DriverLocationUpdate(_) => "driver_location_update",
            OutboundMessage::InventoryUpdate(_) => "inventory_update",
            OutboundMessage::OrderStatusUpdate(_) => "order_status_update",
        }
    }

    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            OutboundMessage::DriverLocationUpdate(report) => serde_json::to_value(report),
            OutboundMessage::InventoryUpdate(report) => serde_json::to_value(report),
            OutboundMessage::OrderStatusUpdate(report) => serde_json::to_value(report),
        }
    }
}
