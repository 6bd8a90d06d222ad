//! One-shot idle timer for pending readings
//!
//! The timer is armed once and re-armed only when a batch leaves, so
//! readings that are filtered out or merely queued do not postpone it.

use tokio::time::{Duration, Instant};

use crate::queue::Offer;

#[derive(Debug, Clone, Copy)]
pub struct IdleTimer {
    period: Duration,
    deadline: Instant,
}

impl IdleTimer {
    /// Arm the timer `period` after `now`
    pub fn new(period: Duration, now: Instant) -> Self {
        Self {
            period,
            deadline: now + period,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Re-arm after a transmission
    pub fn restart(&mut self, now: Instant) {
        self.deadline = now + self.period;
    }

    /// Account for the outcome of a submitted reading.
    ///
    /// Returns true if the timer was re-armed.
    pub fn observe(&mut self, offer: &Offer, now: Instant) -> bool {
        if matches!(offer, Offer::Flush(_)) {
            self.restart(now);
            return true;
        }
        false
    }
}
