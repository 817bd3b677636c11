//! Time adapters.
//!
//! - [`HostClock`]: `std::time::Instant` for the monotonic millisecond
//!   count and the system wall clock (plus a configured UTC offset) for
//!   the local minute of day.
//! - [`ManualClock`]: a settable clock for tests and replay.

use std::cell::Cell;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::app::ports::TimePort;
use crate::scheduler::MINUTES_PER_DAY;

/// Reject obviously unsynced wall-clock time (before 2020-01-01).
const EPOCH_2020: u64 = 1_577_836_800;

pub struct HostClock {
    start: Instant,
    utc_offset_minutes: i16,
}

impl HostClock {
    pub fn new(utc_offset_minutes: i16) -> Self {
        Self {
            start: Instant::now(),
            utc_offset_minutes,
        }
    }
}

impl TimePort for HostClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn minute_of_day(&self) -> Option<u16> {
        let secs = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();
        if secs < EPOCH_2020 {
            return None;
        }
        Some(local_minute_of_day(secs, self.utc_offset_minutes))
    }
}

/// Minute of day for a UNIX timestamp shifted by `offset_minutes`.
pub fn local_minute_of_day(unix_secs: u64, offset_minutes: i16) -> u16 {
    let day = i64::from(MINUTES_PER_DAY);
    let utc_minute = ((unix_secs / 60) % MINUTES_PER_DAY as u64) as i64;
    (utc_minute + i64::from(offset_minutes)).rem_euclid(day) as u16
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: Cell<u64>,
    minute: Cell<Option<u16>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ms(&self, now_ms: u64) {
        self.now_ms.set(now_ms);
    }

    pub fn advance_ms(&self, delta_ms: u64) {
        self.now_ms.set(self.now_ms.get().saturating_add(delta_ms));
    }

    pub fn set_minute_of_day(&self, minute: Option<u16>) {
        self.minute.set(minute);
    }
}

impl TimePort for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }

    fn minute_of_day(&self) -> Option<u16> {
        self.minute.get()
    }
}
