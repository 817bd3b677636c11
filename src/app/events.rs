//! Outbound application events.
//!
//! The [`SignalController`](super::controller::SignalController) emits
//! these through the [`EventSink`](super::ports::EventSink) port.  Adapters
//! on the other side decide what to do with them: log them, mirror them
//! into transport status fields, record them in tests.

use serde::Serialize;

use crate::config::FailSafePolicy;
use crate::error::Error;
use crate::fsm::Phase;
use crate::signal::{Color, OperatingMode};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The controller has started (carries the initial phase).
    Started { phase: Phase, remaining: u32 },

    /// The phase machine advanced; `duration` is the new phase's length.
    PhaseChanged { from: Phase, to: Phase, duration: u32 },

    /// Operating mode switched.
    ModeChanged { from: OperatingMode, to: OperatingMode },

    /// Heartbeat liveness edge.
    LivenessChanged { online: bool },

    /// Liveness was lost and the fail-safe policy took over the heads.
    FailSafeEngaged(FailSafePolicy),

    /// Liveness returned; normal control resumed.
    FailSafeReleased,

    /// One or more safety faults were raised (bitmask).
    FaultDetected(u8),

    /// All safety faults have been cleared.
    FaultCleared,

    /// A command was refused; nothing was applied.
    CommandRejected(Error),

    /// A validated configuration change was adopted.
    ConfigApplied,

    /// Per-cycle state snapshot.
    Telemetry(SignalState),
}

/// The authoritative controller state exposed to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignalState {
    pub phase: Phase,
    pub light1: Color,
    pub light2: Color,
    /// Seconds left in the current phase.
    pub remaining: u32,
    pub mode: OperatingMode,
    pub online: bool,
    pub peak_active: bool,
}
