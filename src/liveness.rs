//! Heartbeat liveness evaluator.
//!
//! The transport refreshes a heartbeat field while the authoritative side
//! is alive.  Each report is stamped with the local monotonic time of
//! arrival; a periodic evaluation turns the age of that stamp into the
//! `online` level and reports edges.
//!
//! State is two atomics, so the monitor can be shared (`Arc`) between the
//! field-ingest path and the evaluation task without a lock.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use log::{info, warn};

use crate::error::{Error, Result};

/// Sentinel for "no heartbeat has ever been observed".
const NEVER: u64 = u64::MAX;

/// Edge reported by [`HeartbeatMonitor::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessTransition {
    WentOnline,
    /// `silent_for_ms` is `None` when no heartbeat was ever seen.
    WentOffline { silent_for_ms: Option<u64> },
}

#[derive(Debug)]
pub struct HeartbeatMonitor {
    last_heartbeat_ms: AtomicU64,
    online: AtomicBool,
    timeout_ms: AtomicU32,
}

impl HeartbeatMonitor {
    /// A monitor that starts offline with no heartbeat recorded.
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            last_heartbeat_ms: AtomicU64::new(NEVER),
            online: AtomicBool::new(false),
            timeout_ms: AtomicU32::new(timeout_ms),
        }
    }

    /// Stamp a heartbeat report received at `now_ms`.
    pub fn record_heartbeat(&self, now_ms: u64) {
        // The sentinel is reserved.
        self.last_heartbeat_ms
            .store(now_ms.min(NEVER - 1), Ordering::Release);
    }

    pub fn last_heartbeat_ms(&self) -> Option<u64> {
        match self.last_heartbeat_ms.load(Ordering::Acquire) {
            NEVER => None,
            t => Some(t),
        }
    }

    /// Age of the last heartbeat, `None` if none was ever seen.
    pub fn silent_for_ms(&self, now_ms: u64) -> Option<u64> {
        self.last_heartbeat_ms()
            .map(|last| now_ms.saturating_sub(last))
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms.load(Ordering::Relaxed)
    }

    pub fn set_timeout_ms(&self, timeout_ms: u32) {
        self.timeout_ms.store(timeout_ms, Ordering::Relaxed);
    }

    /// Level as of the last [`evaluate`](Self::evaluate).
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    /// Recompute the online level at `now_ms`.  Returns the edge, if the
    /// level changed.
    pub fn evaluate(&self, now_ms: u64) -> Option<LivenessTransition> {
        let silent = self.silent_for_ms(now_ms);
        let online = silent.is_some_and(|age| age < u64::from(self.timeout_ms()));
        let was_online = self.online.swap(online, Ordering::AcqRel);

        match (was_online, online) {
            (false, true) => {
                info!("Heartbeat restored: controller online");
                Some(LivenessTransition::WentOnline)
            }
            (true, false) => {
                warn!("Heartbeat lost: silent for {silent:?} ms");
                Some(LivenessTransition::WentOffline {
                    silent_for_ms: silent,
                })
            }
            _ => None,
        }
    }

    /// `Err(LivenessLoss)` while offline as of the last evaluation.
    pub fn check(&self, now_ms: u64) -> Result<()> {
        if self.is_online() {
            return Ok(());
        }
        Err(Error::LivenessLoss {
            silent_for_ms: self.silent_for_ms(now_ms).unwrap_or(now_ms),
        })
    }
}
