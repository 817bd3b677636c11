//! Function-pointer phase state machine engine.
//!
//! Classic embedded table-driven FSM:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  PhaseTable                                                     │
//! │  ┌────────────────┬────────────┬──────────────┬──────────────┐  │
//! │  │ Phase          │ lights     │ duration     │ on_update    │  │
//! │  ├────────────────┼────────────┼──────────────┼──────────────┤  │
//! │  │ Approach1Green │ G / R      │ green policy │ countdown    │  │
//! │  │ Approach1Amber │ A / R      │ amber        │ countdown    │  │
//! │  │ AllRed1        │ R / R      │ all_red      │ countdown    │  │
//! │  │ Approach2Green │ R / G      │ green policy │ countdown    │  │
//! │  │ Approach2Amber │ R / A      │ amber        │ countdown    │  │
//! │  │ AllRed2        │ R / R      │ all_red      │ countdown    │  │
//! │  └────────────────┴────────────┴──────────────┴──────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** phase.  If
//! it returns `Some(next)`, the engine enters `next`: the lamp pair is
//! looked up from the table, the phase clock is reloaded from the
//! descriptor's duration policy, and the optional `on_enter` runs.  All
//! functions receive `&mut FsmContext`, which holds the demand sample,
//! timing profile and phase clock.

pub mod clock;
pub mod context;
pub mod states;

use core::fmt;
use core::str::FromStr;

use context::FsmContext;
use log::info;
use serde::{Deserialize, Serialize};

use crate::signal::{Color, ParseSignalError};

// ---------------------------------------------------------------------------
// Phase identity
// ---------------------------------------------------------------------------

/// The six phases of the two-approach cycle, in cyclic order.
/// Must stay in sync with the table built in [`states::build_phase_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Phase {
    Approach1Green = 0,
    Approach1Amber = 1,
    AllRed1 = 2,
    Approach2Green = 3,
    Approach2Amber = 4,
    AllRed2 = 5,
}

/// Broad class of a phase; selects the duration policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Green,
    Amber,
    AllRed,
}

impl Phase {
    /// Total number of phases, used to size the table array.
    pub const COUNT: usize = 6;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Approach1Green,
        Self::Approach1Amber,
        Self::AllRed1,
        Self::Approach2Green,
        Self::Approach2Amber,
        Self::AllRed2,
    ];

    /// Convert an index back to `Phase`.  Panics on out-of-range in debug
    /// builds; returns `AllRed1` in release (safe fallback).
    pub fn from_index(idx: usize) -> Self {
        match Self::ALL.get(idx) {
            Some(phase) => *phase,
            None => {
                debug_assert!(false, "invalid phase index: {idx}");
                Self::AllRed1
            }
        }
    }

    /// Successor in the fixed cycle.
    pub const fn next(self) -> Self {
        match self {
            Self::Approach1Green => Self::Approach1Amber,
            Self::Approach1Amber => Self::AllRed1,
            Self::AllRed1 => Self::Approach2Green,
            Self::Approach2Green => Self::Approach2Amber,
            Self::Approach2Amber => Self::AllRed2,
            Self::AllRed2 => Self::Approach1Green,
        }
    }

    /// `(light1, light2)` shown during this phase.
    pub const fn lights(self) -> (Color, Color) {
        match self {
            Self::Approach1Green => (Color::Green, Color::Red),
            Self::Approach1Amber => (Color::Amber, Color::Red),
            Self::AllRed1 | Self::AllRed2 => (Color::Red, Color::Red),
            Self::Approach2Green => (Color::Red, Color::Green),
            Self::Approach2Amber => (Color::Red, Color::Amber),
        }
    }

    pub const fn kind(self) -> PhaseKind {
        match self {
            Self::Approach1Green | Self::Approach2Green => PhaseKind::Green,
            Self::Approach1Amber | Self::Approach2Amber => PhaseKind::Amber,
            Self::AllRed1 | Self::AllRed2 => PhaseKind::AllRed,
        }
    }

    /// Transport spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approach1Green => "R1_GREEN",
            Self::Approach1Amber => "R1_AMBER",
            Self::AllRed1 => "ALL_RED_1",
            Self::Approach2Green => "R2_GREEN",
            Self::Approach2Amber => "R2_AMBER",
            Self::AllRed2 => "ALL_RED_2",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ParseSignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or(ParseSignalError)
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` actions.  Runs once per phase entry, after
/// the clock has been loaded.
pub type PhaseActionFn = fn(&mut FsmContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type PhaseUpdateFn = fn(&mut FsmContext) -> Option<Phase>;

/// Signature for the duration policy evaluated on phase entry.
pub type DurationFn = fn(&FsmContext) -> u32;

// ---------------------------------------------------------------------------
// Phase descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single phase.
/// Stored in a fixed-size array; no heap, no `dyn`.
pub struct PhaseDescriptor {
    pub id: Phase,
    pub name: &'static str,
    pub lights: (Color, Color),
    pub duration: DurationFn,
    pub on_enter: Option<PhaseActionFn>,
    pub on_update: PhaseUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The phase state machine engine.
///
/// Owns the phase table (array of [`PhaseDescriptor`]) and threads a
/// mutable [`FsmContext`] through every handler call.
pub struct Fsm {
    /// Fixed-size table indexed by `Phase as usize`.
    table: [PhaseDescriptor; Phase::COUNT],
    /// Index of the currently active phase.
    current: usize,
}

impl Fsm {
    /// Construct a new FSM with the given phase table, starting in `initial`.
    pub fn new(table: [PhaseDescriptor; Phase::COUNT], initial: Phase) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Enter the starting phase: lamps, clock, `on_enter`.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in phase: {}", self.table[self.current].name);
        self.enter(ctx);
    }

    /// Continue a phase that was interrupted (restart recovery) without
    /// reloading its clock.
    pub fn resume(&mut self, phase: Phase, remaining: u32, ctx: &mut FsmContext) {
        self.current = phase as usize;
        let duration = (self.table[self.current].duration)(ctx);
        ctx.clock.restore(remaining, duration);
        ctx.lights = self.table[self.current].lights;
        info!(
            "FSM resuming phase {} with {}s remaining",
            self.table[self.current].name, remaining
        );
    }

    /// Advance the FSM by one tick.
    ///
    /// 1. Call `on_update` for the current phase.
    /// 2. If it returns `Some(next)`, enter `next`.
    ///
    /// Returns the newly entered phase, if any.
    pub fn tick(&mut self, ctx: &mut FsmContext) -> Option<Phase> {
        let next = (self.table[self.current].on_update)(ctx)?;
        self.transition(next, ctx);
        Some(next)
    }

    /// The current phase's identity.
    pub fn current_phase(&self) -> Phase {
        Phase::from_index(self.current)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next: Phase, ctx: &mut FsmContext) {
        let next_idx = next as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        self.current = next_idx;
        self.enter(ctx);
    }

    fn enter(&mut self, ctx: &mut FsmContext) {
        let desc = &self.table[self.current];
        ctx.lights = desc.lights;
        let duration = (desc.duration)(ctx);
        ctx.clock.reset(duration);
        if let Some(enter) = desc.on_enter {
            enter(ctx);
        }
    }
}
