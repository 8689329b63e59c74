//! Reconnect policy for the signaling connection.

use rand::Rng;
use std::time::Duration;

/// Default backoff table, indexed by consecutive failure count.
pub const DEFAULT_BACKOFF_MS: [u64; 5] = [1000, 2000, 3000, 4000, 5000];

/// Default jitter applied to each backoff delay, in percent.
pub const DEFAULT_JITTER_PERCENT: u8 = 20;

/// Bounded reconnect policy.
///
/// The connection is attempted at most `backoff.len()` times (once if the
/// table is empty). After failure `n` the task waits `backoff[n - 1]`
/// perturbed by up to `jitter_percent` in either direction; the failure that
/// exhausts the table is fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before each retry.
    pub backoff: Vec<Duration>,
    /// Maximum random perturbation of each delay, in percent.
    pub jitter_percent: u8,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: DEFAULT_BACKOFF_MS
                .iter()
                .copied()
                .map(Duration::from_millis)
                .collect(),
            jitter_percent: DEFAULT_JITTER_PERCENT,
        }
    }
}

impl RetryPolicy {
    /// Total number of connection attempts before giving up.
    #[must_use]
    pub fn max_attempts(&self) -> usize {
        self.backoff.len().max(1)
    }

    /// Delay to wait after `failures` consecutive failed attempts, or `None`
    /// once the policy is exhausted.
    pub fn delay_after_failure<R: Rng + ?Sized>(
        &self,
        failures: usize,
        rng: &mut R,
    ) -> Option<Duration> {
        if failures >= self.max_attempts() {
            return None;
        }

        let base = self.backoff.get(failures.checked_sub(1)?)?;
        Some(self.apply_jitter(*base, rng))
    }

    fn apply_jitter<R: Rng + ?Sized>(&self, base: Duration, rng: &mut R) -> Duration {
        let percent = i64::from(self.jitter_percent.min(100));
        if percent == 0 {
            return base;
        }

        let offset = rng.gen_range(-percent..=percent);
        let base_ms = i64::try_from(base.as_millis()).unwrap_or(i64::MAX);
        let jittered = base_ms.saturating_mul(100 + offset) / 100;

        Duration::from_millis(u64::try_from(jittered).unwrap_or(0))
    }
}
