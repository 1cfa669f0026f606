//! Reconnect bookkeeping for the realtime feed
//!
//! Times are plain seconds on the caller's clock (the frame loop's elapsed
//! time), which keeps this independent of any runtime and easy to drive from
//! tests.

use tracing::{info, warn};

use crate::feed::ConnectionStatus;

/// Exponential backoff between reconnect attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    pub base_secs: f64,
    pub factor: f64,
    pub max_secs: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_secs: 0.5,
            factor: 2.0,
            max_secs: 30.0,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before attempt number `attempt` (0-based)
    pub fn delay(&self, attempt: u32) -> f64 {
        let exp = self.factor.powi(attempt.min(32) as i32);
        (self.base_secs * exp).min(self.max_secs)
    }
}

/// Connection state of the push channel
#[derive(Debug, Clone, Default)]
pub struct FeedConnection {
    status: ConnectionStatus,
    /// Consecutive failed attempts since the last successful open
    attempts: u32,
    /// When the next reconnect should be started, if one is pending
    retry_at: Option<f64>,
    /// Set once a connection has been open at least once
    was_connected: bool,
    policy: ReconnectPolicy,
}

impl FeedConnection {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn retry_at(&self) -> Option<f64> {
        self.retry_at
    }

    /// Transport reports an open channel. Returns true when this is a
    /// reconnect (the caller should refresh the snapshot).
    pub fn on_open(&mut self) -> bool {
        let reconnected = self.was_connected || self.attempts > 0;
        self.status = ConnectionStatus::Connected;
        self.attempts = 0;
        self.retry_at = None;
        self.was_connected = true;
        if reconnected {
            info!("Sensor feed reconnected");
        }
        reconnected
    }

    /// Transport reports a failure or close; schedules the next attempt.
    /// Repeated failure reports for the same outage don't stack.
    pub fn on_transport_failure(&mut self, now: f64) {
        if self.retry_at.is_some() {
            return;
        }
        self.status = ConnectionStatus::Disconnected;
        let delay = self.policy.delay(self.attempts);
        self.retry_at = Some(now + delay);
        warn!(attempt = self.attempts + 1, delay_secs = delay, "Sensor feed disconnected, scheduling reconnect");
    }

    /// True once when a scheduled reconnect is due; the caller then starts a
    /// new transport.
    pub fn take_due_reconnect(&mut self, now: f64) -> bool {
        match self.retry_at {
            Some(at) if now >= at => {
                self.retry_at = None;
                self.attempts = self.attempts.saturating_add(1);
                true
            }
            _ => false,
        }
    }
}
