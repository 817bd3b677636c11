//! Concrete phase handler functions, duration policy and table builder.
//!
//! Each phase is defined by plain `fn` pointers: no closures, no dynamic
//! dispatch, no heap.
//!
//! ```text
//!  A1_GREEN ──[expired]──▶ A1_AMBER ──[expired]──▶ ALL_RED_1
//!     ▲                                                │
//!  [expired]                                       [expired]
//!     │                                                ▼
//!  ALL_RED_2 ◀──[expired]── A2_AMBER ◀──[expired]── A2_GREEN
//! ```
//!
//! Green phases pick their length once, on entry, from the demand sample
//! in the context.  Amber and all-red always use their fixed intervals.

use super::context::{DemandContext, FsmContext};
use super::{Phase, PhaseDescriptor, PhaseKind};
use crate::config::TimingProfile;
use log::{debug, info};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static phase table.  Called once at startup.
pub fn build_phase_table() -> [PhaseDescriptor; Phase::COUNT] {
    [
        // Index 0: approach 1 green
        PhaseDescriptor {
            id: Phase::Approach1Green,
            name: "A1_GREEN",
            lights: Phase::Approach1Green.lights(),
            duration: green_duration,
            on_enter: Some(green_enter),
            on_update: a1_green_update,
        },
        // Index 1: approach 1 amber
        PhaseDescriptor {
            id: Phase::Approach1Amber,
            name: "A1_AMBER",
            lights: Phase::Approach1Amber.lights(),
            duration: amber_duration,
            on_enter: None,
            on_update: a1_amber_update,
        },
        // Index 2: clearance after approach 1
        PhaseDescriptor {
            id: Phase::AllRed1,
            name: "ALL_RED_1",
            lights: Phase::AllRed1.lights(),
            duration: all_red_duration,
            on_enter: None,
            on_update: all_red_1_update,
        },
        // Index 3: approach 2 green
        PhaseDescriptor {
            id: Phase::Approach2Green,
            name: "A2_GREEN",
            lights: Phase::Approach2Green.lights(),
            duration: green_duration,
            on_enter: Some(green_enter),
            on_update: a2_green_update,
        },
        // Index 4: approach 2 amber
        PhaseDescriptor {
            id: Phase::Approach2Amber,
            name: "A2_AMBER",
            lights: Phase::Approach2Amber.lights(),
            duration: amber_duration,
            on_enter: None,
            on_update: a2_amber_update,
        },
        // Index 5: clearance after approach 2
        PhaseDescriptor {
            id: Phase::AllRed2,
            name: "ALL_RED_2",
            lights: Phase::AllRed2.lights(),
            duration: all_red_duration,
            on_enter: None,
            on_update: all_red_2_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  Duration policy
// ═══════════════════════════════════════════════════════════════════════════

/// Green length for the given demand: peak beats rain beats normal, then
/// the optional floor is applied.
pub fn select_green_duration(demand: &DemandContext, timing: &TimingProfile) -> u32 {
    let base = if demand.peak_active {
        timing.peak_green
    } else if demand.rain_detected {
        timing.rain_green
    } else {
        timing.normal_green
    };
    match timing.min_green {
        Some(floor) => base.max(floor),
        None => base,
    }
}

/// Length of `phase` for the given demand and timing profile.
pub fn select_duration(phase: Phase, demand: &DemandContext, timing: &TimingProfile) -> u32 {
    match phase.kind() {
        PhaseKind::Green => select_green_duration(demand, timing),
        PhaseKind::Amber => timing.amber,
        PhaseKind::AllRed => timing.all_red,
    }
}

fn green_duration(ctx: &FsmContext) -> u32 {
    select_green_duration(&ctx.demand, &ctx.timing)
}

fn amber_duration(ctx: &FsmContext) -> u32 {
    ctx.timing.amber
}

fn all_red_duration(ctx: &FsmContext) -> u32 {
    ctx.timing.all_red
}

// ═══════════════════════════════════════════════════════════════════════════
//  Handlers
// ═══════════════════════════════════════════════════════════════════════════

fn green_enter(ctx: &mut FsmContext) {
    let reason = if ctx.demand.peak_active {
        "peak"
    } else if ctx.demand.rain_detected {
        "rain"
    } else {
        "normal"
    };
    info!("GREEN: {}s ({reason} timing)", ctx.clock.duration());
}

/// Shared countdown: stay until the clock expires, then hand over to `next`.
fn countdown(ctx: &mut FsmContext, next: Phase) -> Option<Phase> {
    if ctx.clock.tick() {
        return Some(next);
    }
    debug!("{}s left before {}", ctx.clock.remaining(), next);
    None
}

fn a1_green_update(ctx: &mut FsmContext) -> Option<Phase> {
    countdown(ctx, Phase::Approach1Amber)
}

fn a1_amber_update(ctx: &mut FsmContext) -> Option<Phase> {
    countdown(ctx, Phase::AllRed1)
}

fn all_red_1_update(ctx: &mut FsmContext) -> Option<Phase> {
    countdown(ctx, Phase::Approach2Green)
}

fn a2_green_update(ctx: &mut FsmContext) -> Option<Phase> {
    countdown(ctx, Phase::Approach2Amber)
}

fn a2_amber_update(ctx: &mut FsmContext) -> Option<Phase> {
    countdown(ctx, Phase::AllRed2)
}

fn all_red_2_update(ctx: &mut FsmContext) -> Option<Phase> {
    countdown(ctx, Phase::Approach1Green)
}

// ═══════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════
