//! Watchdog deadline
//!
//! An owned, re-armable deadline. Arming always replaces the previous
//! deadline, so at most one expiry is ever pending.

use std::time::Duration;
use tokio::time::Instant;

/// Reset-on-activity timeout
#[derive(Debug, Clone, Default)]
pub struct Watchdog {
    deadline: Option<Instant>,
}

impl Watchdog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm to expire `timeout` after `now`, cancelling any pending deadline
    pub fn arm(&mut self, now: Instant, timeout: Duration) {
        self.arm_at(now + timeout);
    }

    /// Arm to expire at an explicit instant, cancelling any pending deadline
    pub fn arm_at(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }
}
