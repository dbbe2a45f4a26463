//! Runtime configuration.
//!
//! Every field has a default; `from_env` overrides them from `REALTIME_*`
//! variables. Unparseable values fall back to the default.

use std::time::Duration;

use crate::connection::{ConnectionSettings, ReconnectPolicy};

#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeConfig {
    /// WebSocket endpoint; `userId` and `userType` are appended per connection.
    pub url: String,
    pub heartbeat_interval_ms: u64,
    pub reconnect_base_ms: u64,
    pub reconnect_max_ms: u64,
    pub reconnect_max_attempts: u32,
    pub connect_timeout_ms: u64,
    /// Capacity of the handle → sequencer command queue.
    pub command_capacity: usize,
    /// Capacity of each subscriber's delivery queue.
    pub subscriber_queue_capacity: usize,
    /// Capacity of the sequencer → router frame queue.
    pub frame_capacity: usize,
    /// Mailbox size of each projection actor.
    pub projection_buffer: usize,
    /// Terminal projections nobody watches are dropped this often. 0 disables.
    pub gc_interval_ms: u64,
    /// Drivers silent for this long are dropped by garbage collection. 0 disables.
    pub driver_idle_ms: u64,
    /// Average courier speed used for great-circle ETA estimates.
    pub assumed_speed_kmh: f64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080/ws".to_string(),
            heartbeat_interval_ms: 30_000,
            reconnect_base_ms: 1_000,
            reconnect_max_ms: 30_000,
            reconnect_max_attempts: 5,
            connect_timeout_ms: 10_000,
            command_capacity: 256,
            subscriber_queue_capacity: 64,
            frame_capacity: 256,
            projection_buffer: 100,
            gc_interval_ms: 60_000,
            driver_idle_ms: 600_000,
            assumed_speed_kmh: 30.0,
        }
    }
}

impl RealtimeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`RealtimeConfig::from_env`], reading from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("REALTIME_URL").filter(|v| !v.trim().is_empty()) {
            config.url = v;
        }
        override_with(&lookup, "REALTIME_HEARTBEAT_INTERVAL_MS", &mut config.heartbeat_interval_ms);
        override_with(&lookup, "REALTIME_RECONNECT_BASE_MS", &mut config.reconnect_base_ms);
        override_with(&lookup, "REALTIME_RECONNECT_MAX_MS", &mut config.reconnect_max_ms);
        override_with(&lookup, "REALTIME_RECONNECT_MAX_ATTEMPTS", &mut config.reconnect_max_attempts);
        override_with(&lookup, "REALTIME_CONNECT_TIMEOUT_MS", &mut config.connect_timeout_ms);
        override_with(&lookup, "REALTIME_COMMAND_CAPACITY", &mut config.command_capacity);
        override_with(&lookup, "REALTIME_SUBSCRIBER_QUEUE_CAPACITY", &mut config.subscriber_queue_capacity);
        override_with(&lookup, "REALTIME_FRAME_CAPACITY", &mut config.frame_capacity);
        override_with(&lookup, "REALTIME_PROJECTION_BUFFER", &mut config.projection_buffer);
        override_with(&lookup, "REALTIME_GC_INTERVAL_MS", &mut config.gc_interval_ms);
        override_with(&lookup, "REALTIME_DRIVER_IDLE_MS", &mut config.driver_idle_ms);
        override_with(&lookup, "REALTIME_ASSUMED_SPEED_KMH", &mut config.assumed_speed_kmh);

        config
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            Duration::from_millis(self.reconnect_base_ms),
            Duration::from_millis(self.reconnect_max_ms),
            self.reconnect_max_attempts,
        )
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            policy: self.reconnect_policy(),
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms.max(1)),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms.max(1)),
            command_capacity: self.command_capacity,
        }
    }

    pub fn gc_interval(&self) -> Option<Duration> {
        (self.gc_interval_ms > 0).then(|| Duration::from_millis(self.gc_interval_ms))
    }

    pub fn driver_idle_after(&self) -> Option<Duration> {
        (self.driver_idle_ms > 0).then(|| Duration::from_millis(self.driver_idle_ms))
    }
}

fn override_with<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, field: &mut T) {
    if let Some(v) = lookup(key) {
        if let Ok(parsed) = v.trim().parse() {
            *field = parsed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_reconnect_contract() {
        let policy = RealtimeConfig::default().reconnect_policy();
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(30));
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(
            RealtimeConfig::default().connection_settings().heartbeat_interval,
            Duration::from_secs(30)
        );
    }

    #[test]
    fn overrides_and_bad_values() {
        let vars: HashMap<&str, &str> = [
            ("REALTIME_URL", "wss://rt.example.com/ws"),
            ("REALTIME_RECONNECT_MAX_ATTEMPTS", "8"),
            ("REALTIME_ASSUMED_SPEED_KMH", "22.5"),
            ("REALTIME_HEARTBEAT_INTERVAL_MS", "soon"),
            ("REALTIME_GC_INTERVAL_MS", "0"),
            ("REALTIME_DRIVER_IDLE_MS", "120000"),
        ]
        .into_iter()
        .collect();
        let config = RealtimeConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.url, "wss://rt.example.com/ws");
        assert_eq!(config.reconnect_max_attempts, 8);
        assert_eq!(config.assumed_speed_kmh, 22.5);
        assert_eq!(config.heartbeat_interval_ms, 30_000);
        assert_eq!(config.gc_interval(), None);
        assert_eq!(config.driver_idle_after(), Some(Duration::from_secs(120)));
    }
}
