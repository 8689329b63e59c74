//! Idle detection for the signaling connection.
//!
//! Any inbound message counts as activity. After `ping_interval` without
//! activity a ping is due, and again every `ping_interval` while the silence
//! lasts. After `idle_timeout` without activity the connection is considered
//! dead.

use std::time::Duration;
use tokio::time::Instant;

/// Default interval of silence before a keepalive ping.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(10);

/// Default interval of silence before hanging up.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// What the connection task should do after an idle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleAction {
    /// Connection is healthy.
    None,
    /// Send a keepalive ping.
    SendPing,
    /// Close the connection.
    HangUp,
}

/// Tracks inbound activity against the ping and idle intervals.
#[derive(Debug, Clone)]
pub struct IdleMonitor {
    ping_interval: Duration,
    idle_timeout: Duration,
    last_activity: Instant,
    last_ping: Option<Instant>,
}

impl IdleMonitor {
    /// Create a monitor whose silence starts counting at `now`.
    #[must_use]
    pub fn new(ping_interval: Duration, idle_timeout: Duration, now: Instant) -> Self {
        Self {
            ping_interval,
            idle_timeout,
            last_activity: now,
            last_ping: None,
        }
    }

    /// Record valid inbound traffic.
    pub fn record_activity(&mut self, now: Instant) {
        self.last_activity = now;
        self.last_ping = None;
    }

    /// Decide what to do at `now`.
    pub fn check(&mut self, now: Instant) -> IdleAction {
        if now.saturating_duration_since(self.last_activity) >= self.idle_timeout {
            return IdleAction::HangUp;
        }

        let quiet_since = self.last_ping.unwrap_or(self.last_activity);
        if now.saturating_duration_since(quiet_since) >= self.ping_interval {
            self.last_ping = Some(now);
            return IdleAction::SendPing;
        }

        IdleAction::None
    }
}
