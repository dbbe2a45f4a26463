//! # Reconnection policy
//!
//! Bounded exponential backoff for a dropped connection:
//!
//! ```text
//! idle → connecting → open ─(drop)→ backoff → connecting → ... → failed
//! ```
//!
//! The delay before reconnect attempt `n` (1-indexed) is
//! `min(max_delay, base_delay × 2^(n-1))`. After `max_attempts` consecutive
//! failed reconnects the policy gives up and stays `failed` until [`ReconnectPolicy::reset`].
//! A successful open also resets the counter.
//!
//! ```rust
//! use std::time::Duration;
//! use realtime_sync::connection::ReconnectPolicy;
//!
//! let policy = ReconnectPolicy::default();
//! assert_eq!(policy.delay_for(1), Duration::from_secs(1));
//! assert_eq!(policy.delay_for(4), Duration::from_secs(8));
//! assert_eq!(policy.delay_for(6), Duration::from_secs(30));
//! ```

use std::time::Duration;

use crate::model::ReconnectPhase;

/// What to do after a connect failure or a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Sleep `delay`, then make reconnect attempt number `attempt`.
    Retry { attempt: u32, delay: Duration },
    /// The attempt ceiling was reached.
    GiveUp { attempts: u32 },
}

#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
    attempt: u32,
    phase: ReconnectPhase,
}

impl Default for ReconnectPolicy {
    /// `base_delay = 1s`, `max_delay = 30s`, `max_attempts = 5`.
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30), 5)
    }
}

impl ReconnectPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_attempts,
            attempt: 0,
            phase: ReconnectPhase::Idle,
        }
    }

    /// Delay before reconnect attempt `attempt` (1-indexed; 0 is treated as 1).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Reconnect attempts made since the last successful open or reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn phase(&self) -> ReconnectPhase {
        self.phase
    }

    pub fn on_connecting(&mut self) {
        self.phase = ReconnectPhase::Connecting;
    }

    pub fn on_open(&mut self) {
        self.attempt = 0;
        self.phase = ReconnectPhase::Open;
    }

    /// A connect attempt failed or an open connection dropped.
    pub fn on_failure(&mut self) -> Decision {
        if self.attempt >= self.max_attempts {
            self.phase = ReconnectPhase::Failed;
            return Decision::GiveUp { attempts: self.attempt };
        }
        self.attempt += 1;
        self.phase = ReconnectPhase::Backoff;
        Decision::Retry {
            attempt: self.attempt,
            delay: self.delay_for(self.attempt),
        }
    }

    /// External trigger (e.g. the app returning to the foreground).
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.phase = ReconnectPhase::Connecting;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_for_first_six_attempts() {
        let policy = ReconnectPolicy::default();
        let expected = [1, 2, 4, 8, 16, 30];
        for (n, secs) in (1..=6).zip(expected) {
            assert_eq!(policy.delay_for(n), Duration::from_secs(secs), "attempt {n}");
            assert_eq!(
                policy.delay_for(n),
                Duration::from_secs(30).min(Duration::from_secs(1) * 2u32.pow(n - 1))
            );
        }
    }

    #[test]
    fn test_huge_attempt_numbers_saturate_at_max() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(64), Duration::from_secs(30));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(30));
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let mut policy = ReconnectPolicy::default();
        policy.on_connecting();
        for n in 1..=5 {
            assert_eq!(
                policy.on_failure(),
                Decision::Retry { attempt: n, delay: policy.delay_for(n) }
            );
        }
        assert_eq!(policy.on_failure(), Decision::GiveUp { attempts: 5 });
        assert_eq!(policy.phase(), ReconnectPhase::Failed);
        // stays failed
        assert_eq!(policy.on_failure(), Decision::GiveUp { attempts: 5 });
    }

    #[test]
    fn test_reset_and_open_restart_the_count() {
        let mut policy = ReconnectPolicy::default();
        for _ in 0..6 {
            policy.on_failure();
        }
        policy.reset();
        assert_eq!(policy.attempt(), 0);
        assert_eq!(policy.phase(), ReconnectPhase::Connecting);
        assert_eq!(policy.on_failure(), Decision::Retry { attempt: 1, delay: Duration::from_secs(1) });

        policy.on_failure();
        policy.on_open();
        assert_eq!(policy.attempt(), 0);
        assert_eq!(policy.phase(), ReconnectPhase::Open);
    }
}
