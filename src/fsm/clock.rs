//! Countdown for the active phase.
//!
//! Counts whole seconds down to zero, one [`tick`](PhaseClock::tick) per
//! control cycle.  Zero is sticky: ticking an expired clock keeps
//! reporting expiry and never goes negative, so the owner must
//! [`reset`](PhaseClock::reset) it with the next phase's duration.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseClock {
    remaining: u32,
    duration: u32,
}

impl PhaseClock {
    pub const fn new() -> Self {
        Self {
            remaining: 0,
            duration: 0,
        }
    }

    /// Load a fresh countdown of `duration` seconds.
    pub fn reset(&mut self, duration: u32) {
        self.remaining = duration;
        self.duration = duration;
    }

    /// Reinstate a countdown captured earlier (restart recovery).
    pub fn restore(&mut self, remaining: u32, duration: u32) {
        self.duration = duration.max(remaining);
        self.remaining = remaining;
    }

    /// Consume one second.  Returns `true` once the countdown has reached 0.
    pub fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }

    /// Seconds left in the current phase.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Duration loaded by the last reset.
    pub fn duration(&self) -> u32 {
        self.duration
    }
}
