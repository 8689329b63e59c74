//! Command backlog tracking for the session actor.
//!
//! The command channel is unbounded so handle calls never block a caller,
//! which may be an observer callback running on the actor itself. The backlog
//! is counted here instead so a caller flooding the session shows up in logs.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Backlog at or below which the session is keeping up.
pub const MAILBOX_NORMAL: usize = 50;

/// Backlog above which every enqueue logs a warning.
pub const MAILBOX_WARNING: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxLevel {
    Normal,
    Warning,
    Critical,
}

impl MailboxLevel {
    fn for_backlog(queued: usize) -> Self {
        match queued {
            n if n > MAILBOX_WARNING => Self::Critical,
            n if n > MAILBOX_NORMAL => Self::Warning,
            _ => Self::Normal,
        }
    }
}

/// Shared between the handles, which count enqueues, and the actor, which
/// counts the commands it takes off the channel.
#[derive(Debug)]
pub struct MailboxMonitor {
    session_label: String,
    queued: AtomicUsize,
    high_water_mark: AtomicUsize,
    commands_handled: AtomicU64,
}

impl MailboxMonitor {
    /// `session_label` identifies the session in log lines, usually
    /// `meeting_id/attendee_id`.
    #[must_use]
    pub fn new(session_label: impl Into<String>) -> Self {
        Self {
            session_label: session_label.into(),
            queued: AtomicUsize::new(0),
            high_water_mark: AtomicUsize::new(0),
            commands_handled: AtomicU64::new(0),
        }
    }

    pub fn record_enqueue(&self) {
        let queued = self.queued.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        self.high_water_mark.fetch_max(queued, Ordering::Relaxed);

        match MailboxLevel::for_backlog(queued) {
            MailboxLevel::Critical => warn!(
                target: "signaling.actor.mailbox",
                session = %self.session_label,
                queued,
                threshold = MAILBOX_WARNING,
                "Session command backlog critical"
            ),
            MailboxLevel::Warning if queued == MAILBOX_NORMAL + 1 => debug!(
                target: "signaling.actor.mailbox",
                session = %self.session_label,
                queued,
                "Session command backlog growing"
            ),
            MailboxLevel::Warning | MailboxLevel::Normal => {}
        }
    }

    pub fn record_dequeue(&self) {
        // Saturates at zero
        let _ = self
            .queued
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
        self.commands_handled.fetch_add(1, Ordering::Relaxed);
    }

    /// Commands enqueued but not yet taken by the actor.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn commands_handled(&self) -> u64 {
        self.commands_handled.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn level(&self) -> MailboxLevel {
        MailboxLevel::for_backlog(self.queued())
    }
}
