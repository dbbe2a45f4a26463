//! Connection identity, lifecycle state and the events published on the
//! `connection` topic.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which app is connecting. Sent as the `userType` URL parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Restaurant,
    Driver,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Restaurant => "restaurant",
            Role::Driver => "driver",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "restaurant" => Ok(Role::Restaurant),
            "driver" => Ok(Role::Driver),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Who is on the other end of the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}

/// Lifecycle of the single transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Where the reconnection policy currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconnectPhase {
    Idle,
    Connecting,
    Open,
    Backoff,
    /// Attempt ceiling reached; waiting for an external reconnect trigger.
    Failed,
}

/// Point-in-time view of the connection, published through a `watch` channel.
///
/// Only the connection sequencer writes this; everyone else reads.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSnapshot {
    pub user_id: String,
    pub role: Role,
    pub state: ConnectionState,
    pub phase: ReconnectPhase,
    pub retry_count: u32,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

impl ConnectionSnapshot {
    pub fn new(identity: &Identity) -> Self {
        Self {
            user_id: identity.user_id.clone(),
            role: identity.role,
            state: ConnectionState::Closed,
            phase: ReconnectPhase::Idle,
            retry_count: 0,
            last_heartbeat: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }
}

/// Payloads published on the `connection` topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConnectionEvent {
    Connected,
    Disconnected {
        reason: String,
    },
    Reconnecting {
        attempt: u32,
        #[serde(rename = "delayMs")]
        delay_ms: u64,
    },
    Failed {
        attempts: u32,
    },
}

impl ConnectionEvent {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn connection_events_match_wire_shape() {
        assert_eq!(ConnectionEvent::Connected.to_value(), json!({"status": "connected"}));
        assert_eq!(
            ConnectionEvent::Disconnected { reason: "eof".into() }.to_value(),
            json!({"status": "disconnected", "reason": "eof"})
        );
        assert_eq!(
            ConnectionEvent::Reconnecting { attempt: 2, delay_ms: 2000 }.to_value(),
            json!({"status": "reconnecting", "attempt": 2, "delayMs": 2000})
        );
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Driver".parse::<Role>(), Ok(Role::Driver));
        assert!("admin".parse::<Role>().is_err());
    }
}
