//! # Heartbeat monitor
//!
//! Sends a `heartbeat` envelope on a fixed interval while the connection is
//! open, to keep idle connections from being reaped by proxies.
//!
//! The monitor is non-authoritative: it never declares the connection dead.
//! Transport errors and closes are the only source of truth. Making missed
//! replies authoritative would need its own timeout state here, without moving
//! connection state out of the sequencer.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::model::{Envelope, MessageType};

#[derive(Debug)]
pub struct HeartbeatMonitor {
    interval: Duration,
    ticker: Option<Interval>,
    last_sent: Option<DateTime<Utc>>,
}

impl HeartbeatMonitor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ticker: None,
            last_sent: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Arms the ticker; the first beat is due one full interval from now.
    pub fn start(&mut self) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
    }

    pub fn stop(&mut self) {
        self.ticker = None;
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Resolves when the next beat is due. Pending forever while stopped.
    pub async fn tick(&mut self) {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// Builds the next beat and records when it was sent.
    pub fn beat(&mut self, user_id: &str) -> Envelope {
        let now = Utc::now();
        self.last_sent = Some(now);
        Envelope {
            user_id: Some(user_id.to_string()),
            ..Envelope::new(MessageType::Heartbeat.as_str(), json!({ "timestamp": now }))
        }
    }

    pub fn last_sent(&self) -> Option<DateTime<Utc>> {
        self.last_sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_on_interval_only_while_running() {
        let mut monitor = HeartbeatMonitor::new(Duration::from_secs(30));
        let stopped = tokio::time::timeout(Duration::from_secs(120), monitor.tick()).await;
        assert!(stopped.is_err());

        monitor.start();
        let started = Instant::now();
        monitor.tick().await;
        assert_eq!(started.elapsed(), Duration::from_secs(30));
        monitor.tick().await;
        assert_eq!(started.elapsed(), Duration::from_secs(60));

        monitor.stop();
        assert!(!monitor.is_running());
    }

    #[test]
    fn test_beat_is_a_heartbeat_envelope() {
        let mut monitor = HeartbeatMonitor::new(Duration::from_secs(30));
        assert!(monitor.last_sent().is_none());
        let beat = monitor.beat("u1");
        assert_eq!(beat.message_type(), Some(MessageType::Heartbeat));
        assert_eq!(beat.user_id.as_deref(), Some("u1"));
        assert!(monitor.last_sent().is_some());
    }
}
