//! Shared mutable context threaded through every phase handler.
//!
//! `FsmContext` is the single struct that phase handlers read from and
//! write to.  It holds the latest demand sample, the phase countdown, the
//! active timing profile, and the lamp outputs the current phase wants.

use crate::config::TimingProfile;
use crate::signal::Color;

use super::clock::PhaseClock;

// ---------------------------------------------------------------------------
// Demand sample (read-only to phase handlers; written by the controller)
// ---------------------------------------------------------------------------

/// Raw demand inputs as reported by the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemandInputs {
    /// Rain sensor reports rain.
    pub rain_detected: bool,
    /// Vehicle presence on approach 1.
    pub presence1: bool,
    /// Vehicle presence on approach 2.
    pub presence2: bool,
}

/// Demand conditions sampled for one control cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemandContext {
    pub rain_detected: bool,
    /// Manual peak override OR inside the scheduled peak window.
    pub peak_active: bool,
    /// Presence inputs do not affect timing; carried for reporting.
    pub presence1: bool,
    pub presence2: bool,
}

impl DemandContext {
    pub fn from_inputs(inputs: DemandInputs, peak_active: bool) -> Self {
        Self {
            rain_detected: inputs.rain_detected,
            peak_active,
            presence1: inputs.presence1,
            presence2: inputs.presence2,
        }
    }
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every phase handler function.
pub struct FsmContext {
    /// Demand sampled at the start of the cycle.
    pub demand: DemandContext,

    /// Countdown for the active phase.
    pub clock: PhaseClock,

    /// Durations used when a phase is entered.
    pub timing: TimingProfile,

    /// Lamp colours requested by the active phase.
    pub lights: (Color, Color),
}

impl FsmContext {
    pub fn new(timing: TimingProfile) -> Self {
        Self {
            demand: DemandContext::default(),
            clock: PhaseClock::new(),
            timing,
            lights: (Color::Red, Color::Red),
        }
    }
}
