//! Virtual microsecond clock all simulated timing derives from.

/// Monotonic virtual time in microseconds.
#[derive(Debug, Default)]
pub struct SimClock {
    now_us: u64,
}

impl SimClock {
    /// Clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now_us(&self) -> u64 {
        self.now_us
    }

    /// Advance by `us`.
    pub fn advance_us(&mut self, us: u64) {
        self.now_us += us;
    }

    /// Advance to an absolute instant. Going backwards is a bug in the
    /// caller; time stays put.
    pub fn advance_to(&mut self, instant_us: u64) {
        debug_assert!(instant_us >= self.now_us);
        self.now_us = self.now_us.max(instant_us);
    }
}
