//! Periodic task scheduler and peak-hour window.
//!
//! The scheduler owns one recurring entry per periodic activity of the
//! controller.  It knows nothing about the controller itself: when an
//! entry comes due it notifies a [`SchedulerDelegate`], and the main loop
//! decides what running that task means.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Periodic Tasks                           │
//! │                                                              │
//! │      ┌──────────────────┐          ┌──────────────────┐      │
//! │      │ HeartbeatEval    │          │ ControlTick      │      │
//! │      │ (every 2–10 s)   │          │ (every 1 s)      │      │
//! │      └────────┬─────────┘          └────────┬─────────┘      │
//! │               │                             │                │
//! │               ▼                             ▼                │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │              SchedulerDelegate                         │  │
//! │  └───────────────────────┬────────────────────────────────┘  │
//! │                          ▼                                   │
//! │        SignalController.evaluate_liveness() / tick()         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The schedule lives and dies with the value that owns it; there are no
//! module-level timer handles.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::app::ports::SchedulerDelegate;
use crate::config::{CONTROL_PERIOD_MS, SystemConfig};

// ═══════════════════════════════════════════════════════════════
//  Peak-hour window
// ═══════════════════════════════════════════════════════════════

/// Minutes in one day.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Daily time-of-day window during which peak green times apply.
///
/// Bounds are minutes after midnight (local time); `start` is inclusive,
/// `end` exclusive.  A window whose start is after its end wraps around
/// midnight.  `start == end` is an empty window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakWindow {
    pub start_minute: u16,
    pub end_minute: u16,
}

impl PeakWindow {
    pub const fn new(start_minute: u16, end_minute: u16) -> Self {
        Self {
            start_minute,
            end_minute,
        }
    }

    /// Check if the given minute-of-day falls within the window.
    pub fn contains(&self, minute: u16) -> bool {
        if self.start_minute <= self.end_minute {
            // e.g., 07:00..09:00
            minute >= self.start_minute && minute < self.end_minute
        } else {
            // e.g., 22:00..02:00 (wraps around midnight)
            minute >= self.start_minute || minute < self.end_minute
        }
    }

    pub fn is_valid(&self) -> bool {
        self.start_minute < MINUTES_PER_DAY && self.end_minute < MINUTES_PER_DAY
    }
}

/// Parse an `HH:MM` clock string into minutes after midnight.
pub fn parse_clock_minutes(s: &str) -> Option<u16> {
    let (h, m) = s.trim().split_once(':')?;
    let h: u16 = h.parse().ok()?;
    let m: u16 = m.parse().ok()?;
    (h < 24 && m < 60).then_some(h * 60 + m)
}

// ═══════════════════════════════════════════════════════════════
//  Task types
// ═══════════════════════════════════════════════════════════════

/// The periodic activities of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Advance the phase state machine by one control cycle.
    ControlTick,
    /// Re-derive `online` from the last heartbeat timestamp.
    HeartbeatEval,
}

/// A recurring task definition.
#[derive(Debug, Clone, Copy)]
pub struct PeriodicTask {
    pub kind: TaskKind,
    pub interval_ms: u64,
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// Maximum number of concurrent tasks (stack-allocated).
const MAX_TASKS: usize = 4;

/// Internal bookkeeping for a live task.
#[derive(Debug, Clone)]
struct TaskEntry {
    task: PeriodicTask,
    /// Monotonic time (ms) at which the task is next due.
    next_due_ms: u64,
}

pub struct Scheduler {
    tasks: heapless::Vec<TaskEntry, MAX_TASKS>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            tasks: heapless::Vec::new(),
        }
    }

    /// Scheduler pre-loaded with the controller's two periodic tasks.
    ///
    /// Heartbeat evaluation is registered first so that, when both are due
    /// in the same pass, the control tick sees the freshest liveness level.
    pub fn for_controller(config: &SystemConfig, now_ms: u64) -> Self {
        let mut sched = Self::new();
        sched.add(
            PeriodicTask {
                kind: TaskKind::HeartbeatEval,
                interval_ms: u64::from(config.heartbeat_eval_interval_ms),
            },
            now_ms,
        );
        sched.add(
            PeriodicTask {
                kind: TaskKind::ControlTick,
                interval_ms: CONTROL_PERIOD_MS,
            },
            now_ms,
        );
        sched
    }

    /// Add a task, first due one interval from `now_ms`.
    /// Returns the slot index, or `None` if full.
    pub fn add(&mut self, task: PeriodicTask, now_ms: u64) -> Option<usize> {
        let entry = TaskEntry {
            task,
            next_due_ms: now_ms.saturating_add(task.interval_ms),
        };
        if self.tasks.push(entry).is_err() {
            return None;
        }
        info!(
            "Scheduler: added {:?} every {} ms",
            task.kind, task.interval_ms
        );
        Some(self.tasks.len() - 1)
    }

    /// Fire every task that is due at `now_ms`.
    ///
    /// A task fires at most once per call.  A task that is late by more
    /// than one interval is re-anchored to `now_ms` instead of firing a
    /// burst of catch-up calls.
    pub fn tick(&mut self, now_ms: u64, delegate: &mut dyn SchedulerDelegate) {
        for entry in self.tasks.iter_mut() {
            if now_ms < entry.next_due_ms {
                continue;
            }

            delegate.on_task_due(entry.task.kind, now_ms);

            let interval = entry.task.interval_ms.max(1);
            let next = entry.next_due_ms.saturating_add(interval);
            entry.next_due_ms = if next <= now_ms {
                debug!("Scheduler: {:?} late, re-anchoring", entry.task.kind);
                now_ms.saturating_add(interval)
            } else {
                next
            };
        }
    }

    /// Milliseconds until the earliest task is due (0 if overdue).
    pub fn next_due_in(&self, now_ms: u64) -> Option<u64> {
        self.tasks
            .iter()
            .map(|e| e.next_due_ms.saturating_sub(now_ms))
            .min()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
