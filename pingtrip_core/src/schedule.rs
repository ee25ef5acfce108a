//! Periodic cadences for the cooperative control loop.

use std::time::{Duration, Instant};

/// Fires at most once per `poll` when its deadline has passed.
///
/// Late polls fire once and re-arm relative to the poll time, so a stalled
/// loop never produces a burst of catch-up callbacks.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    interval: Duration,
    next_due: Instant,
}

impl Cadence {
    /// First firing is one `interval` after `start`.
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            next_due: start + interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due += self.interval;
        if self.next_due <= now {
            self.next_due = now + self.interval;
        }
        true
    }

    /// Time until the next firing, zero if already due.
    pub fn due_in(&self, now: Instant) -> Duration {
        self.next_due.saturating_duration_since(now)
    }
}
